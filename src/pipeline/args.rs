use clap::Args;
use std::path::PathBuf;

use crate::config::{Gating, SearchConfig};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Covariance model file
    pub cmfile: PathBuf,
    /// Sequence database file(s), FASTA
    #[arg(required = true)]
    pub seqdb: Vec<PathBuf>,
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// E-value reporting threshold
    #[arg(short = 'E', long, default_value_t = 10.0)]
    pub evalue: f64,
    /// Bit score reporting threshold; overrides E-value gating when set
    #[arg(short = 'T', long)]
    pub score: Option<f64>,
    /// Include alignment traces in output
    #[arg(short = 'A', long, default_value_t = false)]
    pub alignments: bool,
    /// Tabular output format
    #[arg(short = 't', long, default_value_t = false)]
    pub tabular: bool,
    /// Run the profile-HMM pre-filter before CM scoring
    #[arg(long, default_value_t = false)]
    pub hmm_filter: bool,
    /// Maximum DP matrix size per window, in MB
    #[arg(long, default_value_t = 1024.0)]
    pub max_mx_size: f64,
    /// Permit truncated hits at window/contig boundaries
    #[arg(long, default_value_t = false)]
    pub trunc: bool,
    /// Band-refinement passes for near-threshold candidates
    #[arg(long, default_value_t = 1)]
    pub passes: usize,
    /// Worker threads (0 = all cores)
    #[arg(long, default_value_t = 1)]
    pub threads: usize,
    /// Search the forward strand only
    #[arg(long, default_value_t = false)]
    pub top_only: bool,
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SearchArgs {
    pub fn to_config(&self) -> SearchConfig {
        SearchConfig {
            gating: match self.score {
                Some(t) => Gating::Score(t),
                None => Gating::Evalue(self.evalue),
            },
            alignments: self.alignments,
            hmm_filter: self.hmm_filter,
            max_mx_size_mb: self.max_mx_size,
            truncated: self.trunc,
            passes: self.passes,
            threads: self.threads,
            top_only: self.top_only,
            verbose: self.verbose,
        }
    }
}
