//! Model loading and structural validation against hand-written files.

use covscan::error::ModelError;
use covscan::model::{self, StateType};

use super::helpers::{calibrated_cm_text, load_cm, write_temp};

#[test]
fn fixture_model_loads_with_expected_shape() {
    let cm = load_cm(&calibrated_cm_text());
    assert_eq!(cm.name, "toy25");
    assert_eq!(cm.clen, 13);
    assert_eq!(cm.states.len(), 9);
    assert_eq!(cm.nodes.len(), 9);
    assert_eq!(cm.states[0].ty, StateType::S);
    let cal = cm.calibration.as_ref().unwrap();
    assert_eq!((cal.lambda, cal.mu, cal.eff_seqlen), (0.7, 10.0, 50.0));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = model::load(std::path::Path::new("/nonexistent/model.cm")).unwrap_err();
    assert!(matches!(err, ModelError::Io { .. }));
}

#[test]
fn wrong_magic_is_a_format_error() {
    let f = write_temp("NOT-A-MODEL 1\nNAME x\n//\n");
    let err = model::load(f.path()).unwrap_err();
    assert!(matches!(err, ModelError::Format { .. }), "{err}");
}

#[test]
fn future_format_version_is_unsupported() {
    let text = calibrated_cm_text().replace("COVSCAN-CM 1", "COVSCAN-CM 9");
    let f = write_temp(&text);
    let err = model::load(f.path()).unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedFeature { .. }), "{err}");
}

#[test]
fn emission_row_not_summing_to_one_is_a_checksum_error() {
    let text = calibrated_cm_text().replace(
        "STATE 7 ML 7 0.5 0.1666667 0.1666666 0.1666667",
        "STATE 7 ML 7 0.5 0.5 0.5 0.5",
    );
    let f = write_temp(&text);
    let err = model::load(f.path()).unwrap_err();
    assert!(matches!(err, ModelError::Checksum { .. }), "{err}");
}

#[test]
fn backward_transition_fails_the_load_check() {
    // Point the last match state back at the root.
    let text = calibrated_cm_text().replace("-> 8:1.0", "-> 0:1.0");
    let f = write_temp(&text);
    let err = model::load(f.path()).unwrap_err();
    assert!(matches!(err, ModelError::Checksum { .. }), "{err}");
}

#[test]
fn validate_reports_violations_on_a_mutated_model() {
    let mut cm = load_cm(&calibrated_cm_text());
    assert!(model::validate(&cm).is_ok());

    // An end state must carry no outgoing transitions.
    cm.states[8].trans.push((0, 0.0));
    let report = model::validate(&cm);
    assert!(!report.is_ok());
    assert!(!report.violations.is_empty());
}
