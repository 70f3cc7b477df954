//! Aggregation behavior exercised through the public finalize path.

use covscan::config::{Gating, SearchConfig};
use covscan::hits::{finalize, Hit, Strand};
use covscan::model::Calibration;

fn cal() -> Calibration {
    Calibration {
        lambda: 0.7,
        mu: 10.0,
        eff_seqlen: 50.0,
    }
}

fn hit(seq_id: &str, seq_idx: u32, strand: Strand, start: usize, end: usize, score: f64) -> Hit {
    Hit {
        seq_id: seq_id.into(),
        seq_idx,
        strand,
        start,
        end,
        score,
        evalue: None,
        truncated: false,
        trace: None,
    }
}

fn cfg(gating: Gating) -> SearchConfig {
    SearchConfig {
        gating,
        ..SearchConfig::default()
    }
}

#[test]
fn report_order_is_evalue_then_sequence_then_start() {
    let raw = vec![
        hit("b", 1, Strand::Forward, 5, 20, 18.0),
        hit("a", 0, Strand::Forward, 100, 115, 24.0),
        hit("a", 0, Strand::Forward, 1, 16, 24.0),
    ];
    let out = finalize(raw, "m", Some(&cal()), &cfg(Gating::Evalue(10.0)), 1000).unwrap();
    assert_eq!(out.len(), 3);
    // Strongest first; equal scores fall back to sequence then start.
    assert_eq!((out[0].seq_id.as_str(), out[0].start), ("a", 1));
    assert_eq!((out[1].seq_id.as_str(), out[1].start), ("a", 100));
    assert_eq!(out[2].seq_id.as_str(), "b");
    assert!(out[0].evalue.unwrap() < out[2].evalue.unwrap());
}

#[test]
fn loosening_the_evalue_gate_only_adds_hits() {
    let raw: Vec<Hit> = (0..6)
        .map(|i| hit("s", 0, Strand::Forward, 1 + 100 * i, 20 + 100 * i, 8.0 + 3.0 * i as f64))
        .collect();
    let strict = finalize(raw.clone(), "m", Some(&cal()), &cfg(Gating::Evalue(0.01)), 500).unwrap();
    let loose = finalize(raw, "m", Some(&cal()), &cfg(Gating::Evalue(5.0)), 500).unwrap();
    assert!(loose.len() >= strict.len());
    for h in &strict {
        assert!(
            loose.iter().any(|o| o.start == h.start && o.score == h.score),
            "hit at {} lost when loosening the gate",
            h.start
        );
    }
}

#[test]
fn same_locus_on_opposite_strands_is_not_collapsed() {
    let raw = vec![
        hit("s", 0, Strand::Forward, 10, 40, 22.0),
        hit("s", 0, Strand::Reverse, 12, 38, 21.0),
    ];
    let out = finalize(raw, "m", None, &cfg(Gating::Score(15.0)), 100).unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn overlapping_hits_keep_only_the_strongest() {
    let raw = vec![
        hit("s", 0, Strand::Forward, 10, 40, 22.0),
        hit("s", 0, Strand::Forward, 30, 60, 19.0),
        hit("s", 0, Strand::Forward, 200, 230, 17.0),
    ];
    let out = finalize(raw, "m", None, &cfg(Gating::Score(15.0)), 300).unwrap();
    let starts: Vec<usize> = out.iter().map(|h| h.start).collect();
    assert_eq!(starts, vec![10, 200]);
}
