//! Shared fixtures: small hand-written models and FASTA inputs.

use std::io::Write;

use tempfile::NamedTempFile;

use covscan::model::{self, Cm};

/// Consensus site emitted by [`calibrated_cm`]: six G:G pairs around a
/// single matched A. Its reverse complement (CCCCCCUCCCCCC) scores minus
/// infinity against the model, so the site is strand-specific.
pub const SITE: &str = "GGGGGGAGGGGGG";

/// Forward-strand rendering of a minus-strand consensus site.
pub const SITE_RC: &str = "CCCCCCUCCCCCC";

/// Model text for a 13-column CM whose exact consensus scores 25.0 bits:
/// six pair columns at 4 bits each plus one single column at 1 bit.
/// Calibrated with lambda=0.7, mu=10, eff_seqlen=50.
pub fn calibrated_cm_text() -> String {
    let mut s = String::new();
    s.push_str("COVSCAN-CM 1\n");
    s.push_str("NAME toy25\n");
    s.push_str("ALPH RNA\n");
    s.push_str("CLEN 13\n");
    s.push_str("STATES 9\n");
    s.push_str("NODES 9\n");
    s.push_str("GUMBEL 0.7 10.0 50.0\n");
    s.push_str("NULL 0.25 0.25 0.25 0.25\n");
    s.push_str("NODE 0 ROOT\n");
    s.push_str("STATE 0 S 0 -> 1:1.0\n");
    // Pair emission index 10 is G paired with G.
    for i in 1..=6 {
        s.push_str(&format!("NODE {i} MATP\n"));
        s.push_str(&format!(
            "STATE {i} MP {i} 0 0 0 0 0 0 0 0 0 0 1.0 0 0 0 0 0 -> {}:1.0\n",
            i + 1
        ));
    }
    s.push_str("NODE 7 MATL\n");
    s.push_str("STATE 7 ML 7 0.5 0.1666667 0.1666666 0.1666667 -> 8:1.0\n");
    s.push_str("NODE 8 END\n");
    s.push_str("STATE 8 E 8\n");
    s.push_str("//\n");
    s
}

/// Same model without the GUMBEL line.
pub fn uncalibrated_cm_text() -> String {
    calibrated_cm_text()
        .lines()
        .filter(|l| !l.starts_with("GUMBEL"))
        .map(|l| format!("{l}\n"))
        .collect()
}

pub fn write_temp(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("temp file");
    f.write_all(contents.as_bytes()).expect("write fixture");
    f
}

pub fn load_cm(text: &str) -> Cm {
    let f = write_temp(text);
    model::load(f.path()).expect("fixture model loads")
}

/// Write a FASTA file of (id, sequence) records.
pub fn fasta(records: &[(&str, &str)]) -> NamedTempFile {
    let mut text = String::new();
    for (id, seq) in records {
        text.push_str(&format!(">{id}\n{seq}\n"));
    }
    write_temp(&text)
}

/// A 50-residue sequence with one exact consensus site at positions
/// 21..=33.
pub fn fifty_mer_with_site() -> String {
    format!("{}{}{}", "A".repeat(20), SITE, "A".repeat(17))
}
