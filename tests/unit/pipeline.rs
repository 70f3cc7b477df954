//! End-to-end search runs over fixture models and FASTA inputs.

use covscan::config::{Gating, SearchConfig};
use covscan::hits::{Hit, Strand};
use covscan::pipeline;

use super::helpers::{
    calibrated_cm_text, fasta, fifty_mer_with_site, load_cm, uncalibrated_cm_text, SITE, SITE_RC,
};

fn run(
    cm_text: &str,
    records: &[(&str, &str)],
    cfg: &SearchConfig,
) -> Result<(Vec<Hit>, pipeline::RunStats), covscan::error::UncalibratedModelError> {
    let cm = load_cm(cm_text);
    let db = fasta(records);
    pipeline::run_search(&cm, &[db.path().to_path_buf()], cfg)
}

fn hit_key(h: &Hit) -> (String, char, usize, usize, i64, Option<i64>) {
    (
        h.seq_id.clone(),
        h.strand.as_char(),
        h.start,
        h.end,
        (h.score * 1000.0).round() as i64,
        h.evalue.map(|e| (e.log10() * 1000.0).round() as i64),
    )
}

#[test]
fn end_to_end_single_calibrated_hit() {
    let seq = fifty_mer_with_site();
    let cfg = SearchConfig::default();
    let (hits, stats) = run(&calibrated_cm_text(), &[("t1", &seq)], &cfg).unwrap();

    assert_eq!(stats.records, 1);
    assert_eq!(stats.db_residues, 50);
    assert_eq!(hits.len(), 1, "hits: {hits:?}");

    let h = &hits[0];
    assert_eq!((h.start, h.end), (21, 33));
    assert_eq!(h.strand, Strand::Forward);
    assert!((h.score - 25.0).abs() < 0.01, "score {}", h.score);

    // N_eff = max(50 / 50, 1) = 1, so E = exp(-0.7 * (25 - 10)).
    let expected = (-0.7f64 * 15.0).exp();
    let e = h.evalue.unwrap();
    assert!((e - expected).abs() / expected < 1e-3, "evalue {e}");
}

#[test]
fn deterministic_across_thread_counts() {
    let seq1 = fifty_mer_with_site();
    let seq2 = format!("{}{}{}", "U".repeat(8), SITE_RC, "U".repeat(9));
    let seq3 = format!("{}{}{}{}", SITE, "A".repeat(5), SITE, "A".repeat(4));
    let records: Vec<(&str, &str)> = vec![("a", &seq1), ("b", &seq2), ("c", &seq3)];
    let cfg = SearchConfig {
        alignments: true,
        ..SearchConfig::default()
    };

    let mut baseline: Option<Vec<_>> = None;
    for threads in [1usize, 2, 4, 8, 16, 32] {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        let (hits, _) = pool
            .install(|| run(&calibrated_cm_text(), &records, &cfg))
            .unwrap();
        let keys: Vec<_> = hits.iter().map(hit_key).collect();
        match &baseline {
            None => baseline = Some(keys),
            Some(b) => assert_eq!(&keys, b, "thread count {threads} changed the report"),
        }
    }
}

#[test]
fn minus_strand_site_reports_once_in_forward_frame() {
    let seq = format!("{}{}{}", "U".repeat(10), SITE_RC, "U".repeat(7));
    let cfg = SearchConfig::default();
    let (hits, _) = run(&calibrated_cm_text(), &[("rev", &seq)], &cfg).unwrap();

    assert_eq!(hits.len(), 1, "hits: {hits:?}");
    let h = &hits[0];
    assert_eq!(h.strand, Strand::Reverse);
    // Normalized coordinates cover the site in forward numbering.
    assert_eq!((h.start, h.end), (11, 23));
    // Rendered coordinates read downstream-to-upstream on the minus strand.
    assert_eq!(h.frame_coords(), (23, 11));
}

#[test]
fn filter_admits_every_final_hit() {
    let seq = fifty_mer_with_site();
    let base = SearchConfig::default();
    let filtered = SearchConfig {
        hmm_filter: true,
        ..SearchConfig::default()
    };
    let (plain, _) = run(&calibrated_cm_text(), &[("t1", &seq)], &base).unwrap();
    let (with_filter, _) = run(&calibrated_cm_text(), &[("t1", &seq)], &filtered).unwrap();

    let a: Vec<_> = plain.iter().map(hit_key).collect();
    let b: Vec<_> = with_filter.iter().map(hit_key).collect();
    assert_eq!(a, b, "pre-filter dropped or altered a reportable hit");
}

#[test]
fn matrix_ceiling_skips_windows_without_crashing() {
    let seq = fifty_mer_with_site();
    let cfg = SearchConfig {
        max_mx_size_mb: 0.0,
        ..SearchConfig::default()
    };
    let (hits, stats) = run(&calibrated_cm_text(), &[("t1", &seq)], &cfg).unwrap();
    assert!(hits.is_empty());
    assert!(stats.skipped_windows > 0);
}

#[test]
fn evalue_gating_requires_calibration() {
    let seq = fifty_mer_with_site();
    let err = run(
        &uncalibrated_cm_text(),
        &[("t1", &seq)],
        &SearchConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("no calibration"));
}

#[test]
fn score_gating_works_without_calibration() {
    let seq = fifty_mer_with_site();
    let cfg = SearchConfig {
        gating: Gating::Score(20.0),
        ..SearchConfig::default()
    };
    let (hits, _) = run(&uncalibrated_cm_text(), &[("t1", &seq)], &cfg).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].evalue, None);

    let strict = SearchConfig {
        gating: Gating::Score(26.0),
        ..SearchConfig::default()
    };
    let (none, _) = run(&uncalibrated_cm_text(), &[("t1", &seq)], &strict).unwrap();
    assert!(none.is_empty());
}

#[test]
fn multi_file_run_contains_per_file_failures() {
    let cm = load_cm(&calibrated_cm_text());
    let seq = fifty_mer_with_site();
    let good = fasta(&[("t1", &seq)]);
    let paths = vec![
        std::path::PathBuf::from("/nonexistent/input.fa"),
        good.path().to_path_buf(),
    ];
    let cfg = SearchConfig::default();
    let (hits, stats) = pipeline::run_search(&cm, &paths, &cfg).unwrap();
    assert!(stats.incomplete());
    assert_eq!(stats.failed_files.len(), 1);
    // The good file was still searched to completion.
    assert_eq!(hits.len(), 1);
}

#[test]
fn refinement_passes_never_lose_hits() {
    let seq = fifty_mer_with_site();
    let one_pass = SearchConfig::default();
    let three_pass = SearchConfig {
        passes: 3,
        ..SearchConfig::default()
    };
    let (a, _) = run(&calibrated_cm_text(), &[("t1", &seq)], &one_pass).unwrap();
    let (b, _) = run(&calibrated_cm_text(), &[("t1", &seq)], &three_pass).unwrap();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert!(y.score >= x.score - f64::EPSILON);
    }
}
