//! Integration test harness.
//!
//! Tests are organized by subsystem:
//! - `model`  - model loading and structural validation
//! - `engine` - banded CYK properties over small fixture models
//! - `hits`   - aggregation, gating, overlap resolution, ordering
//! - `pipeline` - end-to-end search runs, determinism across pools

pub mod unit {
    pub mod helpers;

    mod engine;
    mod hits;
    mod model;
    mod pipeline;
}
