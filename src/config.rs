//! Run-level search configuration.
//!
//! One `SearchConfig` is built per run from the CLI arguments and passed by
//! reference into every stage. No stage mutates it.

/// Threshold gating mode. An explicit score threshold overrides E-value
/// gating entirely; the two are never combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gating {
    /// Keep hits with `E <= max_evalue`. Requires a calibrated model.
    Evalue(f64),
    /// Keep hits with `score >= min_bits`. Works on uncalibrated models.
    Score(f64),
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub gating: Gating,
    /// Attach a traceback string to each surviving hit.
    pub alignments: bool,
    /// Run the profile-HMM pre-filter before full CM scoring.
    pub hmm_filter: bool,
    /// DP matrix memory ceiling in MB. Windows whose estimate exceeds it
    /// are retried with a narrowed band, then skipped (counted, not fatal).
    pub max_mx_size_mb: f64,
    /// Permit parses lacking full begin/end context at window boundaries.
    pub truncated: bool,
    /// Band-refinement passes; pass N+1 widens bands for near-threshold
    /// candidates from pass N.
    pub passes: usize,
    pub threads: usize,
    /// Scan the forward strand only.
    pub top_only: bool,
    pub verbose: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            gating: Gating::Evalue(10.0),
            alignments: false,
            hmm_filter: false,
            max_mx_size_mb: 1024.0,
            truncated: false,
            passes: 1,
            threads: 1,
            top_only: false,
            verbose: false,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Gating::Evalue(e) = self.gating {
            if e <= 0.0 {
                return Err("E-value threshold must be positive".to_string());
            }
        }
        if self.max_mx_size_mb <= 0.0 {
            return Err("maximum matrix size must be positive".to_string());
        }
        if self.passes == 0 {
            return Err("number of passes must be at least 1".to_string());
        }
        Ok(())
    }
}
