//! Banded CYK over the covariance model.
//!
//! `M[v][j][d]` is the best bit score of a parse subtree rooted at state
//! `v` generating the length-`d` subsequence ending at 1-based position
//! `j` of the window. Transitions point forward in the arena except insert
//! self-loops, which consume a residue and therefore only reference
//! strictly smaller `d` — one reverse sweep over states with `d` ascending
//! inside each fills the whole matrix. Probability zero is negative
//! infinity throughout; max over it never manufactures a NaN because no
//! subtraction of infinities occurs.

use crate::engine::bands::Bands;
use crate::model::{Cm, StateType};
use crate::sequence::decode_residue;

/// Flat penalty for beginning a truncated parse at an internal match node.
pub const LOCAL_BEGIN_PENALTY: f32 = -3.0;

/// Best parse found in a window, in window-local 1-based coordinates.
#[derive(Debug, Clone)]
pub struct CykResult {
    pub score: f32,
    pub start: usize,
    pub end: usize,
    pub begin_state: usize,
    pub truncated: bool,
}

/// Banded triangular DP matrix, one plane per state.
pub struct CykMatrix {
    len: usize,
    dmin: Vec<usize>,
    width: Vec<usize>,
    planes: Vec<Vec<f32>>,
}

impl CykMatrix {
    fn new(bands: &Bands, len: usize) -> Self {
        let n = bands.dmin.len();
        let mut dmin = Vec::with_capacity(n);
        let mut width = Vec::with_capacity(n);
        let mut planes = Vec::with_capacity(n);
        for v in 0..n {
            let (lo, hi) = bands.clamp(v, len);
            let w = if hi >= lo { hi - lo + 1 } else { 0 };
            dmin.push(lo);
            width.push(w);
            planes.push(vec![f32::NEG_INFINITY; w * (len + 1)]);
        }
        Self {
            len,
            dmin,
            width,
            planes,
        }
    }

    #[inline]
    fn get(&self, v: usize, j: usize, d: usize) -> f32 {
        let lo = self.dmin[v];
        let w = self.width[v];
        if w == 0 || d > j || d < lo || d >= lo + w {
            return f32::NEG_INFINITY;
        }
        self.planes[v][j * w + (d - lo)]
    }

    #[inline]
    fn set(&mut self, v: usize, j: usize, d: usize, score: f32) {
        let lo = self.dmin[v];
        let w = self.width[v];
        debug_assert!(w > 0 && d >= lo && d < lo + w && d <= j);
        self.planes[v][j * w + (d - lo)] = score;
    }
}

/// Fill the banded matrix for one window slice.
pub fn fill(cm: &Cm, bands: &Bands, residues: &[u8]) -> CykMatrix {
    let len = residues.len();
    let mut mx = CykMatrix::new(bands, len);
    let n = cm.states.len();

    for v in (0..n).rev() {
        let st = &cm.states[v];
        let (lo, hi) = bands.clamp(v, len);
        if hi < lo {
            continue;
        }
        match st.ty {
            StateType::E => {
                if lo == 0 {
                    for j in 0..=len {
                        mx.set(v, j, 0, 0.0);
                    }
                }
            }
            StateType::B => {
                let (l, r) = st.split.expect("validated B state");
                let (r_lo, r_hi) = bands.clamp(r, len);
                for j in 0..=len {
                    for d in lo..=hi.min(j) {
                        let mut best = f32::NEG_INFINITY;
                        for dr in r_lo..=r_hi.min(d) {
                            let s = mx.get(l, j - dr, d - dr) + mx.get(r, j, dr);
                            if s > best {
                                best = s;
                            }
                        }
                        mx.set(v, j, d, best);
                    }
                }
            }
            StateType::S | StateType::D => {
                for j in 0..=len {
                    for d in lo..=hi.min(j) {
                        let mut best = f32::NEG_INFINITY;
                        for &(y, t) in &st.trans {
                            let s = mx.get(y, j, d) + t;
                            if s > best {
                                best = s;
                            }
                        }
                        mx.set(v, j, d, best);
                    }
                }
            }
            StateType::Ml | StateType::Il => {
                for j in 1..=len {
                    for d in lo.max(1)..=hi.min(j) {
                        let i = j - d + 1;
                        let esc = cm.emit_score(v, residues[i - 1]);
                        let mut best = f32::NEG_INFINITY;
                        for &(y, t) in &st.trans {
                            let s = mx.get(y, j, d - 1) + t;
                            if s > best {
                                best = s;
                            }
                        }
                        mx.set(v, j, d, esc + best);
                    }
                }
            }
            StateType::Mr | StateType::Ir => {
                for j in 1..=len {
                    for d in lo.max(1)..=hi.min(j) {
                        let esc = cm.emit_score(v, residues[j - 1]);
                        let mut best = f32::NEG_INFINITY;
                        for &(y, t) in &st.trans {
                            let s = mx.get(y, j - 1, d - 1) + t;
                            if s > best {
                                best = s;
                            }
                        }
                        mx.set(v, j, d, esc + best);
                    }
                }
            }
            StateType::Mp => {
                for j in 2..=len {
                    for d in lo.max(2)..=hi.min(j) {
                        let i = j - d + 1;
                        let esc = cm.pair_score(v, residues[i - 1], residues[j - 1]);
                        let mut best = f32::NEG_INFINITY;
                        for &(y, t) in &st.trans {
                            let s = mx.get(y, j - 1, d - 2) + t;
                            if s > best {
                                best = s;
                            }
                        }
                        mx.set(v, j, d, esc + best);
                    }
                }
            }
        }
    }
    mx
}

/// Best parse over the filled matrix. With `truncated` set, parses may
/// also begin at internal match nodes for a flat penalty, admitting hits
/// clipped by a window or contig boundary.
pub fn best_parse(
    cm: &Cm,
    bands: &Bands,
    mx: &CykMatrix,
    truncated: bool,
) -> Option<CykResult> {
    let len = mx.len;
    let mut best: Option<CykResult> = None;

    let mut consider = |v: usize, penalty: f32, is_trunc: bool, best: &mut Option<CykResult>| {
        let (lo, hi) = bands.clamp(v, len);
        for j in 0..=len {
            for d in lo.max(1)..=hi.min(j) {
                let score = mx.get(v, j, d) + penalty;
                if score.is_finite() && best.as_ref().map_or(true, |b| score > b.score) {
                    *best = Some(CykResult {
                        score,
                        start: j - d + 1,
                        end: j,
                        begin_state: v,
                        truncated: is_trunc,
                    });
                }
            }
        }
    };

    consider(0, 0.0, false, &mut best);
    if truncated {
        for v in cm.local_begin_states() {
            consider(v, LOCAL_BEGIN_PENALTY, true, &mut best);
        }
    }
    best
}

/// Re-derive the winning parse as a compact trace string. The walk is an
/// explicit stack, so trace depth is bounded by the matrix rather than the
/// call stack. `offset` shifts window-local positions into the reported
/// coordinate frame.
pub fn traceback(
    cm: &Cm,
    mx: &CykMatrix,
    residues: &[u8],
    root: &CykResult,
    offset: usize,
) -> String {
    let mut tokens: Vec<String> = Vec::new();
    if root.truncated {
        tokens.push("~".to_string());
    }
    let mut stack = vec![(root.begin_state, root.end, root.end - root.start + 1)];

    while let Some((v, j, d)) = stack.pop() {
        let st = &cm.states[v];
        let val = mx.get(v, j, d);
        match st.ty {
            StateType::E => tokens.push(format!("E{v}")),
            StateType::B => {
                let (l, r) = st.split.expect("validated B state");
                tokens.push(format!("B{v}"));
                let mut found = false;
                for dr in 0..=d {
                    let s = mx.get(l, j - dr, d - dr) + mx.get(r, j, dr);
                    if close(s, val) {
                        // Left subtree renders before the right one.
                        stack.push((r, j, dr));
                        stack.push((l, j - dr, d - dr));
                        found = true;
                        break;
                    }
                }
                debug_assert!(found, "traceback lost the split point");
            }
            StateType::S | StateType::D => {
                tokens.push(format!("{}{v}", st.ty.as_str()));
                follow(mx, st, val, j, d, &mut stack);
            }
            StateType::Ml | StateType::Il => {
                let i = j - d + 1;
                let esc = cm.emit_score(v, residues[i - 1]);
                tokens.push(format!(
                    "{}{v}@{}{}",
                    st.ty.as_str(),
                    offset + i,
                    decode_residue(residues[i - 1])
                ));
                follow(mx, st, val - esc, j, d - 1, &mut stack);
            }
            StateType::Mr | StateType::Ir => {
                let esc = cm.emit_score(v, residues[j - 1]);
                tokens.push(format!(
                    "{}{v}@{}{}",
                    st.ty.as_str(),
                    offset + j,
                    decode_residue(residues[j - 1])
                ));
                follow(mx, st, val - esc, j - 1, d - 1, &mut stack);
            }
            StateType::Mp => {
                let i = j - d + 1;
                let esc = cm.pair_score(v, residues[i - 1], residues[j - 1]);
                tokens.push(format!(
                    "MP{v}@{}{}:{}{}",
                    offset + i,
                    decode_residue(residues[i - 1]),
                    offset + j,
                    decode_residue(residues[j - 1])
                ));
                follow(mx, st, val - esc, j - 1, d - 2, &mut stack);
            }
        }
    }
    tokens.join(" ")
}

/// Push the transition child that reproduces `target` at `(j, d)`.
fn follow(
    mx: &CykMatrix,
    st: &crate::model::State,
    target: f32,
    j: usize,
    d: usize,
    stack: &mut Vec<(usize, usize, usize)>,
) {
    for &(y, t) in &st.trans {
        if close(mx.get(y, j, d) + t, target) {
            stack.push((y, j, d));
            return;
        }
    }
    debug_assert!(false, "traceback lost a transition from state {}", st.idx);
}

#[inline]
fn close(a: f32, b: f32) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= 1e-3 * a.abs().max(b.abs()).max(1.0)
}
