//! Hit aggregation: E-value assignment, threshold gating, per-locus
//! overlap resolution and final ordering.

use rustc_hash::FxHashMap;

use crate::config::{Gating, SearchConfig};
use crate::error::UncalibratedModelError;
use crate::hits::{final_order_compare, score_compare, Hit, Strand};
use crate::model::Calibration;
use crate::stats;

/// Finalize the raw hit set for one run. The input arrives in arbitrary
/// worker-completion order; the output order is fully deterministic.
///
/// E-value gating against an uncalibrated model is an error; score gating
/// (`-T`) works without calibration and simply leaves `evalue` unset.
pub fn finalize(
    raw_hits: Vec<Hit>,
    model_name: &str,
    calibration: Option<&Calibration>,
    cfg: &SearchConfig,
    db_residues: u64,
) -> Result<Vec<Hit>, UncalibratedModelError> {
    if calibration.is_none() && matches!(cfg.gating, Gating::Evalue(_)) {
        return Err(UncalibratedModelError {
            model: model_name.to_string(),
        });
    }

    let mut hits = raw_hits;
    if let Some(cal) = calibration {
        for h in &mut hits {
            h.evalue = Some(stats::evalue(h.score, cal, db_residues));
        }
    }

    hits.retain(|h| match cfg.gating {
        Gating::Score(t) => h.score >= t,
        // Calibration presence was checked above.
        Gating::Evalue(t) => h.evalue.is_some_and(|e| e <= t),
    });

    let mut hits = resolve_overlaps(hits);
    hits.sort_by(final_order_compare);
    Ok(hits)
}

/// Among hits on the same sequence and strand with overlapping spans, keep
/// only the highest scoring one (ties: earliest start). Greedy over a
/// score-sorted list, so re-running it on its own output is a no-op.
pub fn resolve_overlaps(hits: Vec<Hit>) -> Vec<Hit> {
    let mut by_locus: FxHashMap<(u32, bool), Vec<Hit>> = FxHashMap::default();
    for h in hits {
        by_locus
            .entry((h.seq_idx, h.strand == Strand::Reverse))
            .or_default()
            .push(h);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_locus {
        group.sort_by(score_compare);
        let mut winners: Vec<Hit> = Vec::new();
        for h in group {
            if !winners.iter().any(|w| w.overlaps(&h)) {
                winners.push(h);
            }
        }
        kept.extend(winners);
    }
    kept
}
