//! Report rendering over the finalized hit list.
//!
//! Both renderers are pure: they never reorder, re-filter, or otherwise
//! second-guess the aggregator.

pub mod standard;
pub mod tabular;

use std::io::{self, Write};

use crate::hits::Hit;
use crate::pipeline::RunStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Standard,
    Tabular,
}

/// Run-level context shown in headers and footers.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub model_name: &'a str,
    /// Model file path as given on the command line.
    pub query: String,
    /// Target database path(s), comma-joined.
    pub targets: String,
    pub stats: &'a RunStats,
}

pub fn render<W: Write>(
    hits: &[Hit],
    ctx: &ReportContext,
    format: OutputFormat,
    writer: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Standard => standard::write(hits, ctx, writer),
        OutputFormat::Tabular => tabular::write(hits, ctx, writer),
    }
}

/// E-value column text. Uncalibrated runs carry no E-value at all.
pub(crate) fn format_evalue(evalue: Option<f64>) -> String {
    match evalue {
        None => "-".to_string(),
        Some(e) if e == 0.0 || e < 1.0e-180 => "0.0".to_string(),
        Some(e) if e < 0.0009 => format!("{e:.1e}"),
        Some(e) if e < 0.1 => format!("{e:.3}"),
        Some(e) if e < 10.0 => format!("{e:.2}"),
        Some(e) => format!("{e:.0}"),
    }
}

pub(crate) fn format_score(score: f64) -> String {
    if score > 99.9 {
        format!("{:.0}", score.round())
    } else {
        format!("{score:.1}")
    }
}
