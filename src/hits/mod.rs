//! Hit representation and ordering.
//!
//! Coordinates are stored normalized: 1-based, inclusive, on the forward
//! strand, with `start <= end` regardless of strand. Rendering swaps the
//! endpoints for minus-strand hits so the reported frame reads 5'->3' along
//! the hit, which is also how overlap resolution can treat both strands
//! uniformly.

pub mod finalize;

use std::cmp::Ordering;

pub use finalize::{finalize, resolve_overlaps};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub seq_id: String,
    /// Input-order index of the source record, for deterministic ordering.
    pub seq_idx: u32,
    pub strand: Strand,
    /// 1-based inclusive forward-strand coordinates, `start <= end`.
    pub start: usize,
    pub end: usize,
    /// Raw bit score against the null model.
    pub score: f64,
    /// Set by the aggregator when the model is calibrated.
    pub evalue: Option<f64>,
    /// Parse lacked full begin/end context at a window boundary.
    pub truncated: bool,
    /// Compact parse trace, present when alignments were requested.
    pub trace: Option<String>,
}

impl Hit {
    /// Coordinates oriented to the reported strand: minus-strand hits read
    /// high..low in forward numbering.
    pub fn frame_coords(&self) -> (usize, usize) {
        match self.strand {
            Strand::Forward => (self.start, self.end),
            Strand::Reverse => (self.end, self.start),
        }
    }

    pub fn overlaps(&self, other: &Hit) -> bool {
        self.seq_idx == other.seq_idx
            && self.strand == other.strand
            && self.start <= other.end
            && other.start <= self.end
    }
}

/// Order used inside overlap resolution: score descending, ties broken by
/// earliest start, then shortest span.
pub fn score_compare(a: &Hit, b: &Hit) -> Ordering {
    match b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match a.start.cmp(&b.start) {
        Ordering::Equal => {}
        ord => return ord,
    }
    a.end.cmp(&b.end)
}

/// Final report order: E-value ascending (equivalently score descending),
/// then sequence, then start coordinate. Deterministic for any input
/// permutation, which is what makes the report independent of worker
/// scheduling.
pub fn final_order_compare(a: &Hit, b: &Hit) -> Ordering {
    match (a.evalue, b.evalue) {
        (Some(ea), Some(eb)) => match ea.partial_cmp(&eb).unwrap_or(Ordering::Equal) {
            Ordering::Equal => {}
            ord => return ord,
        },
        _ => {}
    }
    match b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match a.seq_id.cmp(&b.seq_id) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match a.seq_idx.cmp(&b.seq_idx) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match a.start.cmp(&b.start) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // Palindromic sites can tie on everything else across strands.
    (a.strand == Strand::Reverse).cmp(&(b.strand == Strand::Reverse))
}
