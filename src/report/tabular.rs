//! Tab-separated report, one line per hit.

use std::io::{self, Write};

use super::{format_evalue, format_score, ReportContext};
use crate::hits::Hit;

pub fn write<W: Write>(hits: &[Hit], ctx: &ReportContext, out: &mut W) -> io::Result<()> {
    writeln!(out, "#seq_id\tstrand\tstart\tend\tscore\tevalue\ttrace")?;
    for hit in hits {
        let (start, end) = hit.frame_coords();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            hit.seq_id,
            hit.strand.as_char(),
            start,
            end,
            format_score(hit.score),
            format_evalue(hit.evalue),
            hit.trace.as_deref().unwrap_or("-"),
        )?;
    }
    let s = ctx.stats;
    writeln!(
        out,
        "# model {} | {} record(s) | {} residue(s) | {} window(s) degraded | {} skipped",
        ctx.model_name, s.records, s.db_residues, s.degraded_windows, s.skipped_windows
    )?;
    if s.incomplete() {
        writeln!(out, "# INCOMPLETE")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::Strand;
    use crate::pipeline::RunStats;

    #[test]
    fn columns_are_fixed_and_tab_separated() {
        let hit = Hit {
            seq_id: "chr1".into(),
            seq_idx: 0,
            strand: Strand::Reverse,
            start: 100,
            end: 140,
            score: 31.2,
            evalue: None,
            truncated: false,
            trace: None,
        };
        let stats = RunStats::default();
        let ctx = ReportContext {
            model_name: "toy",
            query: "toy.cm".into(),
            targets: "db.fa".into(),
            stats: &stats,
        };
        let mut buf = Vec::new();
        write(&[hit], &ctx, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row = text.lines().nth(1).unwrap();
        let cols: Vec<&str> = row.split('\t').collect();
        assert_eq!(cols, ["chr1", "-", "140", "100", "31.2", "-", "-"]);
    }
}
