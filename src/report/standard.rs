//! Human-readable report: header, ranked hit table, optional trace
//! blocks, run-statistics footer.

use std::io::{self, Write};

use super::{format_evalue, format_score, ReportContext};
use crate::hits::Hit;

pub fn write<W: Write>(hits: &[Hit], ctx: &ReportContext, out: &mut W) -> io::Result<()> {
    writeln!(out, "covscan {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "Query:       {} [{}]", ctx.model_name, ctx.query)?;
    writeln!(out, "Target:      {}", ctx.targets)?;
    writeln!(out, "Hits:        {}", hits.len())?;
    writeln!(out)?;

    if !hits.is_empty() {
        writeln!(
            out,
            "  rank    E-value   score  sequence                        start      end  strand  trunc"
        )?;
        writeln!(
            out,
            " -----  ---------  ------  ------------------------------  -------  -------  ------  -----"
        )?;
        for (i, hit) in hits.iter().enumerate() {
            let (start, end) = hit.frame_coords();
            let name = if hit.seq_id.chars().count() > 30 {
                let head: String = hit.seq_id.chars().take(27).collect();
                format!("{head}...")
            } else {
                format!("{:<30}", hit.seq_id)
            };
            writeln!(
                out,
                "  ({:>3})  {:>9}  {:>6}  {}  {:>7}  {:>7}  {:>6}  {:>5}",
                i + 1,
                format_evalue(hit.evalue),
                format_score(hit.score),
                name,
                start,
                end,
                hit.strand.as_char(),
                if hit.truncated { "yes" } else { "no" },
            )?;
        }
        writeln!(out)?;

        for (i, hit) in hits.iter().enumerate() {
            if let Some(trace) = &hit.trace {
                writeln!(out, ">> hit {} {} ({})", i + 1, hit.seq_id, hit.strand.as_char())?;
                writeln!(out, "   {trace}")?;
                writeln!(out)?;
            }
        }
    }

    write_footer(ctx, out)
}

fn write_footer<W: Write>(ctx: &ReportContext, out: &mut W) -> io::Result<()> {
    let s = ctx.stats;
    writeln!(
        out,
        "# searched {} record(s) ({} residues) in {} file(s)",
        s.records, s.db_residues, s.files
    )?;
    writeln!(
        out,
        "# {} window(s) aligned, {} degraded (narrowed bands), {} skipped (matrix ceiling)",
        s.windows, s.degraded_windows, s.skipped_windows
    )?;
    if s.incomplete() {
        for path in &s.failed_files {
            writeln!(out, "# failed input: {}", path.display())?;
        }
        writeln!(out, "# INCOMPLETE: one or more inputs were not searched")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::Strand;
    use crate::pipeline::RunStats;

    fn hit() -> Hit {
        Hit {
            seq_id: "seq1".into(),
            seq_idx: 0,
            strand: Strand::Forward,
            start: 11,
            end: 60,
            score: 25.0,
            evalue: Some(4.53e-5),
            truncated: false,
            trace: None,
        }
    }

    #[test]
    fn report_carries_hit_count_and_footer() {
        let stats = RunStats {
            files: 1,
            records: 1,
            db_residues: 50,
            windows: 2,
            degraded_windows: 1,
            ..RunStats::default()
        };
        let ctx = ReportContext {
            model_name: "toy",
            query: "toy.cm".into(),
            targets: "db.fa".into(),
            stats: &stats,
        };
        let mut buf = Vec::new();
        write(&[hit()], &ctx, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Hits:        1"));
        assert!(text.contains("4.5e-5"));
        assert!(text.contains("# searched 1 record(s) (50 residues) in 1 file(s)"));
        assert!(text.contains("# 2 window(s) aligned, 1 degraded (narrowed bands), 0 skipped"));
        assert!(!text.contains("INCOMPLETE"));
    }

    #[test]
    fn failed_inputs_flag_the_report_incomplete() {
        let stats = RunStats {
            failed_files: vec!["bad.fa".into()],
            ..RunStats::default()
        };
        let ctx = ReportContext {
            model_name: "toy",
            query: "toy.cm".into(),
            targets: "db.fa,bad.fa".into(),
            stats: &stats,
        };
        let mut buf = Vec::new();
        write(&[], &ctx, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# INCOMPLETE"));
        assert!(text.contains("bad.fa"));
    }

    #[test]
    fn long_multibyte_names_truncate_cleanly() {
        let mut h = hit();
        h.seq_id = "abcdefghijklmnopqrstuvwxyzééééé".into();
        let stats = RunStats::default();
        let ctx = ReportContext {
            model_name: "toy",
            query: "toy.cm".into(),
            targets: "db.fa".into(),
            stats: &stats,
        };
        let mut buf = Vec::new();
        write(&[h], &ctx, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("abcdefghijklmnopqrstuvwxyzé..."));
    }

    #[test]
    fn minus_strand_rows_swap_endpoints() {
        let mut h = hit();
        h.strand = Strand::Reverse;
        let stats = RunStats::default();
        let ctx = ReportContext {
            model_name: "toy",
            query: "toy.cm".into(),
            targets: "db.fa".into(),
            stats: &stats,
        };
        let mut buf = Vec::new();
        write(&[h], &ctx, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row = text.lines().find(|l| l.contains("seq1")).unwrap();
        let start_col = row.find("60").unwrap();
        let end_col = row.find("11").unwrap();
        assert!(start_col < end_col, "row: {row}");
    }
}
