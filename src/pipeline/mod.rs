//! Search orchestration: fans database records out across a rayon pool,
//! runs filter and alignment per strand, and collects raw hits over an
//! mpsc channel for deterministic aggregation.

pub mod args;

pub use args::SearchArgs;

use std::path::PathBuf;
use std::sync::mpsc;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::config::{Gating, SearchConfig};
use crate::engine::{self, Bands};
use crate::error::UncalibratedModelError;
use crate::filter::{self, Window};
use crate::hits::{self, Hit, Strand};
use crate::model::{Cm, FilterHmm};
use crate::sequence::{SequenceRecord, SequenceSource};
use crate::stats;

/// Band slop for the first pass; each further pass doubles it.
const BASE_BAND_SLOP: usize = 4;

/// Candidates this close to the reporting threshold (either side) are
/// re-aligned with wider bands when extra passes are enabled.
const REFINE_MARGIN_BITS: f64 = 3.0;

/// Headroom below the reporting threshold that the pre-filter must keep.
/// A window the filter drops is never re-examined.
const FILTER_HEADROOM_BITS: f64 = 15.0;

/// Hard cap on the filter admission threshold in bits.
const FILTER_CAP_BITS: f32 = 3.0;

#[derive(Debug, Default)]
pub struct RunStats {
    pub files: usize,
    pub records: usize,
    pub db_residues: u64,
    pub windows: usize,
    /// Windows scored with a narrowed band to fit the matrix ceiling.
    pub degraded_windows: usize,
    /// Windows skipped because even a narrowed band blew the matrix ceiling.
    pub skipped_windows: usize,
    pub failed_files: Vec<PathBuf>,
}

impl RunStats {
    /// True when any input file failed to parse and its records were not
    /// searched.
    pub fn incomplete(&self) -> bool {
        !self.failed_files.is_empty()
    }
}

pub struct SearchOutcome {
    pub hits: Vec<Hit>,
    pub stats: RunStats,
}

/// Per-run immutable context shared by all workers.
struct PassContext {
    /// One band set per pass, widest last.
    bands: Vec<Bands>,
    filter: Option<(FilterHmm, f32)>,
    /// Longest span the model can emit under the first-pass bands.
    max_hit_len: usize,
    /// Lower bound on the final reporting threshold in bits, used for the
    /// refinement window. Zero when no bound is known.
    refine_floor: f64,
}

impl PassContext {
    fn build(cm: &Cm, cfg: &SearchConfig) -> Self {
        let bands: Vec<Bands> = (0..cfg.passes.max(1))
            .map(|p| engine::bands::compute(cm, BASE_BAND_SLOP << p))
            .collect();
        let max_hit_len = bands[0].w;

        let refine_floor = match (&cfg.gating, &cm.calibration) {
            (Gating::Score(t), _) => *t,
            // db_residues 0 clamps the search space to one, the smallest
            // the E-value formula admits, so this bound only under-shoots.
            (Gating::Evalue(e), Some(cal)) => stats::score_for_evalue(*e, cal, 0),
            (Gating::Evalue(_), None) => 0.0,
        };

        let filter = cfg.hmm_filter.then(|| {
            let fhmm = match &cm.filter_hmm {
                Some(f) => f.clone(),
                None => filter::project_from_cm(cm),
            };
            let thr = fhmm
                .threshold
                .min((refine_floor - FILTER_HEADROOM_BITS) as f32)
                .min(FILTER_CAP_BITS);
            (fhmm, thr)
        });

        Self {
            bands,
            filter,
            max_hit_len,
            refine_floor,
        }
    }
}

/// Counts reported by each worker alongside its hits.
#[derive(Debug, Default, Clone, Copy)]
struct RecordCounts {
    windows: usize,
    degraded: usize,
    skipped: usize,
}

/// Search every record of every input file against the model. Uses
/// whatever rayon pool is current, so callers control the thread count.
/// A file that fails to parse is recorded in the stats and skipped; the
/// remaining files are still searched.
pub fn search(cm: &Cm, paths: &[PathBuf], cfg: &SearchConfig) -> SearchOutcome {
    let ctx = PassContext::build(cm, cfg);
    let mut stats = RunStats::default();
    let mut raw_hits: Vec<Hit> = Vec::new();

    let mut source = SequenceSource::open(paths.to_vec());
    while let Some(batch) = source.next_file() {
        let batch = match batch {
            Ok(b) => b,
            Err(e) => {
                eprintln!("[WARN] skipping input: {e}");
                let path = match &e {
                    crate::error::SequenceError::Io { path, .. }
                    | crate::error::SequenceError::Parse { path, .. } => path.clone(),
                };
                stats.failed_files.push(path);
                continue;
            }
        };
        stats.files += 1;
        stats.records += batch.records.len();
        stats.db_residues += batch.records.iter().map(|r| r.len() as u64).sum::<u64>();

        let pb = if cfg.verbose {
            let pb = ProgressBar::new(batch.records.len() as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb.set_message(format!("{}", batch.path.display()));
            pb
        } else {
            ProgressBar::hidden()
        };

        let (tx, rx) = mpsc::channel::<(Vec<Hit>, RecordCounts)>();
        batch
            .records
            .par_iter()
            .for_each_with(tx, |tx, record| {
                let result = scan_record(cm, &ctx, record, cfg);
                pb.inc(1);
                // The receiver outlives all senders.
                let _ = tx.send(result);
            });
        pb.finish_and_clear();

        for (hits, counts) in rx {
            raw_hits.extend(hits);
            stats.windows += counts.windows;
            stats.degraded_windows += counts.degraded;
            stats.skipped_windows += counts.skipped;
        }
    }

    if cfg.verbose {
        eprintln!(
            "[INFO] searched {} record(s), {} residue(s), {} window(s) aligned, {} degraded, {} skipped",
            stats.records, stats.db_residues, stats.windows, stats.degraded_windows,
            stats.skipped_windows
        );
    }

    SearchOutcome {
        hits: raw_hits,
        stats,
    }
}

/// Scan both strands of one record. Hits come back in normalized
/// forward-strand coordinates regardless of the strand they scored on.
fn scan_record(
    cm: &Cm,
    ctx: &PassContext,
    record: &SequenceRecord,
    cfg: &SearchConfig,
) -> (Vec<Hit>, RecordCounts) {
    let mut hits = Vec::new();
    let mut counts = RecordCounts::default();
    if record.is_empty() {
        return (hits, counts);
    }

    scan_strand(
        cm,
        ctx,
        &record.residues,
        Strand::Forward,
        record,
        cfg,
        &mut hits,
        &mut counts,
    );
    if !cfg.top_only {
        let rc = record.revcomp();
        scan_strand(
            cm,
            ctx,
            &rc,
            Strand::Reverse,
            record,
            cfg,
            &mut hits,
            &mut counts,
        );
    }
    (hits, counts)
}

#[allow(clippy::too_many_arguments)]
fn scan_strand(
    cm: &Cm,
    ctx: &PassContext,
    residues: &[u8],
    strand: Strand,
    record: &SequenceRecord,
    cfg: &SearchConfig,
    hits: &mut Vec<Hit>,
    counts: &mut RecordCounts,
) {
    let windows = match &ctx.filter {
        Some((fhmm, thr)) => filter::scan(fhmm, residues, ctx.max_hit_len, *thr),
        None => vec![Window::whole(residues.len())],
    };

    for window in &windows {
        counts.windows += 1;
        match align_with_refinement(cm, ctx, residues, window, cfg) {
            Ok(aligned) => {
                if aligned.degraded {
                    counts.degraded += 1;
                }
                if let Some(raw) = aligned.hit {
                    let (start, end) = match strand {
                        Strand::Forward => (raw.start, raw.end),
                        Strand::Reverse => {
                            let len = residues.len();
                            (len - raw.end + 1, len - raw.start + 1)
                        }
                    };
                    hits.push(Hit {
                        seq_id: record.id.clone(),
                        seq_idx: record.idx,
                        strand,
                        start,
                        end,
                        score: raw.score as f64,
                        evalue: None,
                        truncated: raw.truncated,
                        trace: raw.trace,
                    });
                }
            }
            Err(e) => {
                counts.skipped += 1;
                if cfg.verbose {
                    eprintln!("[WARN] {}: {e}", record.id);
                }
            }
        }
    }
}

/// First-pass alignment, then optional wider-band passes for candidates
/// near the reporting threshold. Extra passes only re-score; a candidate
/// that vanished under wider bands keeps its earlier result.
fn align_with_refinement(
    cm: &Cm,
    ctx: &PassContext,
    residues: &[u8],
    window: &Window,
    cfg: &SearchConfig,
) -> Result<engine::Alignment, crate::error::EngineError> {
    let mut best = engine::align(cm, &ctx.bands[0], residues, window, cfg)?;

    for bands in &ctx.bands[1..] {
        let near = match &best.hit {
            Some(h) => (h.score as f64 - ctx.refine_floor).abs() <= REFINE_MARGIN_BITS,
            None => false,
        };
        if !near {
            break;
        }
        // Wider bands explore a superset of parses; keep the better score.
        if let Ok(wider) = engine::align(cm, bands, residues, window, cfg) {
            match (&best.hit, &wider.hit) {
                (Some(h), Some(w)) if w.score > h.score => best = wider,
                _ => {}
            }
        }
    }
    Ok(best)
}

/// Full search-and-aggregate path shared by the binary and the tests:
/// raw scan, then E-value assignment, threshold gating, overlap
/// resolution, and final deterministic ordering.
pub fn run_search(
    cm: &Cm,
    paths: &[PathBuf],
    cfg: &SearchConfig,
) -> Result<(Vec<Hit>, RunStats), UncalibratedModelError> {
    let outcome = search(cm, paths, cfg);
    let hits = hits::finalize(
        outcome.hits,
        &cm.name,
        cm.calibration.as_ref(),
        cfg,
        outcome.stats.db_residues,
    )?;
    Ok((hits, outcome.stats))
}

/// Resolve the worker thread count, treating zero as all cores.
pub fn effective_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}
