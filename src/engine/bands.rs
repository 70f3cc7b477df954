//! Yield bands over the grammar.
//!
//! For every state the model topology fixes the minimum and maximum number
//! of residues its subtree can emit; insert self-loops make the maximum
//! unbounded, so it is capped by a maximum insert run. The DP only visits
//! subsequence lengths inside `[dmin, dmax]` per state, widened by a slop
//! margin that trades memory for indel sensitivity. Wider bands can only
//! raise the reported score, never lower it.

use crate::model::{Cm, StateType};

/// Longest insert run admitted through a single insert state.
const MAX_INSERT_RUN: usize = 30;

#[derive(Debug, Clone)]
pub struct Bands {
    pub dmin: Vec<usize>,
    pub dmax: Vec<usize>,
    /// Maximum hit length the root can yield under these bands.
    pub w: usize,
    /// Slop the bands were widened by, kept for diagnostics.
    pub slop: usize,
}

impl Bands {
    /// Effective band for one state against a window of `len` residues.
    #[inline]
    pub fn clamp(&self, v: usize, len: usize) -> (usize, usize) {
        (self.dmin[v].min(len), self.dmax[v].min(len))
    }
}

/// Compute exact per-state yield bounds, then widen by `slop`.
pub fn compute(cm: &Cm, slop: usize) -> Bands {
    let n = cm.states.len();
    let mut lo = vec![0usize; n];
    let mut hi = vec![0usize; n];

    for v in (0..n).rev() {
        let st = &cm.states[v];
        let emitted = st.ty.emitted();
        match st.ty {
            StateType::E => {
                lo[v] = 0;
                hi[v] = 0;
            }
            StateType::B => {
                let (l, r) = st.split.expect("validated B state");
                lo[v] = lo[l] + lo[r];
                hi[v] = hi[l].saturating_add(hi[r]);
            }
            _ => {
                let mut child_lo = usize::MAX;
                let mut child_hi = 0usize;
                let mut self_loop = false;
                for &(y, _) in &st.trans {
                    if y == v {
                        self_loop = true;
                        continue;
                    }
                    child_lo = child_lo.min(lo[y]);
                    child_hi = child_hi.max(hi[y]);
                }
                if child_lo == usize::MAX {
                    // Only a self-loop: degenerate, validated against.
                    child_lo = 0;
                }
                lo[v] = child_lo + emitted;
                hi[v] = child_hi + emitted;
                if self_loop {
                    // The first insert residue is already in `emitted`.
                    hi[v] = hi[v].saturating_add(MAX_INSERT_RUN - 1);
                }
            }
        }
    }

    let w_cap = hi[0].saturating_add(slop);
    let dmin: Vec<usize> = lo.iter().map(|&d| d.saturating_sub(slop)).collect();
    let dmax: Vec<usize> = hi
        .iter()
        .map(|&d| d.saturating_add(slop).min(w_cap))
        .collect();
    let w = dmax[0];
    Bands {
        dmin,
        dmax,
        w,
        slop,
    }
}

/// Memory estimate in MB for a banded DP matrix over `len` residues.
pub fn estimate_mb(bands: &Bands, len: usize) -> f64 {
    let mut cells: u64 = 0;
    for v in 0..bands.dmin.len() {
        let (lo, hi) = bands.clamp(v, len);
        if hi >= lo {
            cells += ((hi - lo + 1) as u64) * ((len + 1) as u64);
        }
    }
    (cells * std::mem::size_of::<f32>() as u64) as f64 / (1024.0 * 1024.0)
}

/// Halve the band widths toward their lower bound. Used once per window as
/// graceful degradation before giving up on a too-large matrix.
pub fn narrow(bands: &Bands) -> Bands {
    let dmax = bands
        .dmin
        .iter()
        .zip(&bands.dmax)
        .map(|(&lo, &hi)| lo + (hi - lo) / 2)
        .collect::<Vec<_>>();
    let w = dmax[0];
    Bands {
        dmin: bands.dmin.clone(),
        dmax,
        w,
        slop: bands.slop / 2,
    }
}
