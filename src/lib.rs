pub mod config;
pub mod error;
pub mod model;
pub mod sequence;

pub mod engine;
pub mod filter;
pub mod hits;
pub mod stats;

pub mod pipeline;
pub mod report;
