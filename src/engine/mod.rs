//! Banded CYK alignment of admitted windows.
//!
//! The engine owns matrix-size governance: it estimates the banded DP
//! footprint before allocating, narrows the band once as graceful
//! degradation, and fails the window with `MatrixTooLarge` if that is
//! still not enough. Callers treat the failure as a skipped region, never
//! as a fatal error.

pub mod bands;
pub mod cyk;

pub use bands::Bands;

use crate::config::SearchConfig;
use crate::error::EngineError;
use crate::filter::Window;
use crate::model::Cm;

/// A scoring hit in 1-based inclusive coordinates on the scanned strand.
#[derive(Debug, Clone)]
pub struct RawHit {
    pub start: usize,
    pub end: usize,
    pub score: f32,
    pub truncated: bool,
    pub trace: Option<String>,
}

/// Outcome of aligning one window.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub hit: Option<RawHit>,
    /// The window was scored with a narrowed band to fit the matrix
    /// ceiling; sensitivity may be degraded.
    pub degraded: bool,
}

/// Floor below which a window yields no hit at all; final thresholds are
/// applied later by the aggregator.
const REPORT_FLOOR_BITS: f32 = 0.0;

/// Score one admitted window. `residues` is the full strand the window
/// indexes into.
pub fn align(
    cm: &Cm,
    bands: &Bands,
    residues: &[u8],
    window: &Window,
    cfg: &SearchConfig,
) -> Result<Alignment, EngineError> {
    let slice = &residues[window.start..window.end];
    if slice.is_empty() {
        return Ok(Alignment {
            hit: None,
            degraded: false,
        });
    }

    let mut active = bands.clone();
    let mut degraded = false;
    if bands::estimate_mb(&active, slice.len()) > cfg.max_mx_size_mb {
        active = bands::narrow(&active);
        degraded = true;
        let estimate_mb = bands::estimate_mb(&active, slice.len());
        if estimate_mb > cfg.max_mx_size_mb {
            return Err(EngineError::MatrixTooLarge {
                estimate_mb,
                limit_mb: cfg.max_mx_size_mb,
                start: window.start,
                end: window.end,
            });
        }
    }

    let mx = cyk::fill(cm, &active, slice);
    let hit = match cyk::best_parse(cm, &active, &mx, cfg.truncated) {
        Some(best) if best.score > REPORT_FLOOR_BITS => {
            let trace = cfg
                .alignments
                .then(|| cyk::traceback(cm, &mx, slice, &best, window.start));
            Some(RawHit {
                start: window.start + best.start,
                end: window.start + best.end,
                score: best.score,
                truncated: best.truncated,
                trace,
            })
        }
        _ => None,
    };

    Ok(Alignment { hit, degraded })
}
