//! Profile-HMM pre-filter.
//!
//! A cheap, structure-unaware local Viterbi scan over the sequence admits
//! candidate windows for full CM scoring. The scan threshold is permissive
//! by construction: a region the full model would accept must never be
//! rejected here, so the pipeline caps the threshold well below the final
//! reporting cutoff. A false positive only costs alignment time.

use crate::model::{Cm, FilterHmm, StateType};

/// Candidate window over a strand-specific residue slice: 0-based,
/// half-open, with the provisional filter score in bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

impl Window {
    pub fn whole(len: usize) -> Self {
        Self {
            start: 0,
            end: len,
            score: f32::INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Gap costs of the filter profile, in bits. Kept loose; the full model
/// re-scores everything the filter admits.
const INSERT_COST: f32 = -1.0;
const DELETE_COST: f32 = -1.0;

/// Scan one strand with the filter HMM. `max_hit_len` is the widest span
/// the CM can produce (band-derived W); windows are padded with it so a
/// peak anywhere inside a true hit still covers the whole hit.
pub fn scan(
    hmm: &FilterHmm,
    residues: &[u8],
    max_hit_len: usize,
    threshold_bits: f32,
) -> Vec<Window> {
    let n_cols = hmm.match_scores.len();
    let len = residues.len();
    if n_cols == 0 || len == 0 {
        return Vec::new();
    }

    // Rolling match/insert/delete columns, indexed by profile column k.
    let mut m_prev = vec![f32::NEG_INFINITY; n_cols + 1];
    let mut i_prev = vec![f32::NEG_INFINITY; n_cols + 1];
    let mut d_prev = vec![f32::NEG_INFINITY; n_cols + 1];
    let mut m_cur = vec![f32::NEG_INFINITY; n_cols + 1];
    let mut i_cur = vec![f32::NEG_INFINITY; n_cols + 1];
    let mut d_cur = vec![f32::NEG_INFINITY; n_cols + 1];

    let mut peaks: Vec<(usize, f32)> = Vec::new();
    for (j, &res) in residues.iter().enumerate() {
        let mut col_best = f32::NEG_INFINITY;
        for k in 1..=n_cols {
            let msc = if res < 4 {
                hmm.match_scores[k - 1][res as usize]
            } else {
                crate::model::AMBIG_SCORE
            };
            // Local alignment: a match may also start fresh (the 0.0 arm).
            let diag = m_prev[k - 1].max(i_prev[k - 1]).max(d_prev[k - 1]).max(0.0);
            m_cur[k] = msc + diag;
            i_cur[k] = INSERT_COST + m_prev[k].max(i_prev[k]);
            d_cur[k] = DELETE_COST + m_cur[k - 1].max(d_cur[k - 1]);
            if m_cur[k] > col_best {
                col_best = m_cur[k];
            }
        }
        if col_best >= threshold_bits {
            peaks.push((j, col_best));
        }
        std::mem::swap(&mut m_prev, &mut m_cur);
        std::mem::swap(&mut i_prev, &mut i_cur);
        std::mem::swap(&mut d_prev, &mut d_cur);
        m_cur.fill(f32::NEG_INFINITY);
        i_cur.fill(f32::NEG_INFINITY);
        d_cur.fill(f32::NEG_INFINITY);
    }

    windows_from_peaks(&peaks, len, max_hit_len)
}

/// Pad each peak to a window wide enough to contain any parse through it,
/// then merge overlapping windows, keeping the best provisional score.
fn windows_from_peaks(peaks: &[(usize, f32)], len: usize, max_hit_len: usize) -> Vec<Window> {
    let pad = max_hit_len / 2 + 10;
    let mut merged: Vec<Window> = Vec::new();
    for &(j, score) in peaks {
        let start = j.saturating_sub(max_hit_len + pad);
        let end = (j + pad + 1).min(len);
        match merged.last_mut() {
            Some(last) if start <= last.end => {
                last.end = end.max(last.end);
                last.score = last.score.max(score);
            }
            _ => merged.push(Window { start, end, score }),
        }
    }
    merged
}

/// Project a filter HMM from the CM when the model file carries no `FHMM`
/// block: one column per single-emitting match state, pair states
/// contributing their left and right marginals. Column order follows state
/// order, which is close enough to consensus order for admission control.
pub fn project_from_cm(cm: &Cm) -> FilterHmm {
    let mut match_scores = Vec::with_capacity(cm.clen);
    for st in &cm.states {
        match st.ty {
            StateType::Ml | StateType::Mr => {
                let mut col = [0.0f32; 4];
                col.copy_from_slice(&st.emit);
                match_scores.push(col);
            }
            StateType::Mp => {
                let mut left = [0.0f32; 4];
                let mut right = [0.0f32; 4];
                for a in 0..4 {
                    left[a] = marginal(&st.emit, a, true);
                    right[a] = marginal(&st.emit, a, false);
                }
                match_scores.push(left);
                match_scores.push(right);
            }
            _ => {}
        }
    }
    FilterHmm {
        match_scores,
        threshold: 0.0,
    }
}

/// Marginal log-odds of one residue in a pair emission row, summing the
/// partner axis in probability space with uniform weights.
fn marginal(pair_scores: &[f32], res: usize, left: bool) -> f32 {
    let mut p = 0.0f64;
    for other in 0..4 {
        let idx = if left { res * 4 + other } else { other * 4 + res };
        let s = pair_scores[idx] as f64;
        if s.is_finite() {
            p += 0.25 * s.exp2();
        }
    }
    if p <= 0.0 {
        f32::NEG_INFINITY
    } else {
        p.log2() as f32
    }
}
