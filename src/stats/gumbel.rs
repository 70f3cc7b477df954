//! Extreme-value statistics for bit scores.
//!
//! Calibrated models carry Gumbel tail parameters (lambda, mu) fitted over
//! searches of an effective sequence length. E-values scale that tail to
//! the size of the database actually searched:
//!
//!   E = N_eff * exp(-lambda * (S - mu)),  N_eff = max(db_residues / eff_seqlen, 1)
//!
//! E is monotonically non-increasing in S for fixed parameters, which the
//! threshold-monotonicity property of the aggregator relies on.

use crate::model::Calibration;

/// Effective database multiplier for a database of `db_residues` total
/// residues (forward strand; the calibration already accounts for strand
/// doubling).
pub fn effective_db_size(cal: &Calibration, db_residues: u64) -> f64 {
    (db_residues as f64 / cal.eff_seqlen).max(1.0)
}

/// E-value of a bit score against a database of the given size.
pub fn evalue(score: f64, cal: &Calibration, db_residues: u64) -> f64 {
    effective_db_size(cal, db_residues) * (-cal.lambda * (score - cal.mu)).exp()
}

/// Inverse of [`evalue`]: the bit score at which a hit's E-value equals
/// `target`. Used to turn an E-value gate into a bit cutoff for the
/// engine's near-threshold refinement window.
pub fn score_for_evalue(target: f64, cal: &Calibration, db_residues: u64) -> f64 {
    let n = effective_db_size(cal, db_residues);
    if target <= 0.0 {
        return f64::INFINITY;
    }
    cal.mu - (target / n).ln() / cal.lambda
}
