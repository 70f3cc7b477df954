//! Banding and matrix-governance properties over the fixture model.

use covscan::config::SearchConfig;
use covscan::engine::{self, bands};
use covscan::filter::Window;
use covscan::sequence;

use super::helpers::{calibrated_cm_text, fifty_mer_with_site, load_cm};

fn encode(seq: &str) -> Vec<u8> {
    seq.bytes()
        .map(|b| sequence::encode_residue(b).unwrap())
        .collect()
}

#[test]
fn wider_bands_never_lower_the_score() {
    let cm = load_cm(&calibrated_cm_text());
    let residues = encode(&fifty_mer_with_site());
    let window = Window::whole(residues.len());
    let cfg = SearchConfig::default();

    let narrow = bands::compute(&cm, 2);
    let wide = bands::compute(&cm, 40);
    let a = engine::align(&cm, &narrow, &residues, &window, &cfg)
        .unwrap()
        .hit
        .unwrap();
    let b = engine::align(&cm, &wide, &residues, &window, &cfg)
        .unwrap()
        .hit
        .unwrap();
    assert!(b.score >= a.score - 1e-4);
    // The fixture has no insert states, so widening is score-neutral.
    assert!((b.score - a.score).abs() < 1e-4);
}

#[test]
fn window_offsets_map_back_to_strand_coordinates() {
    let cm = load_cm(&calibrated_cm_text());
    let residues = encode(&fifty_mer_with_site());
    let b = bands::compute(&cm, 4);
    let cfg = SearchConfig::default();

    // Window covering the site (0-based half-open 15..40).
    let window = Window {
        start: 15,
        end: 40,
        score: 0.0,
    };
    let hit = engine::align(&cm, &b, &residues, &window, &cfg)
        .unwrap()
        .hit
        .unwrap();
    assert_eq!((hit.start, hit.end), (21, 33));
}

#[test]
fn narrowing_shrinks_the_matrix_estimate() {
    let cm = load_cm(&calibrated_cm_text());
    let wide = bands::compute(&cm, 50);
    let narrowed = bands::narrow(&wide);
    let len = 10_000;
    assert!(bands::estimate_mb(&narrowed, len) < bands::estimate_mb(&wide, len));
}

#[test]
fn oversized_window_is_a_recoverable_error() {
    let cm = load_cm(&calibrated_cm_text());
    let b = bands::compute(&cm, 4);
    let residues = encode(&fifty_mer_with_site());
    let window = Window::whole(residues.len());
    let cfg = SearchConfig {
        max_mx_size_mb: 0.0,
        ..SearchConfig::default()
    };
    let err = engine::align(&cm, &b, &residues, &window, &cfg).unwrap_err();
    assert!(err.to_string().contains("exceeds ceiling"));
}
