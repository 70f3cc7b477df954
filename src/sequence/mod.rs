//! Database sequence streaming and residue encoding.
//!
//! Records are read per input file with `bio::io::fasta` and normalized to
//! a 0..4 residue code (A, C, G, U, ambiguous) at read time, so the filter
//! and the DP engine index emission tables directly. A failing file is
//! reported to the caller without poisoning other files in a multi-file
//! run.

use std::fs::File;
use std::path::{Path, PathBuf};

use bio::io::fasta;

use crate::error::SequenceError;

/// A=0, C=1, G=2, U=3; every IUPAC ambiguity code collapses to 4.
pub const AMBIG: u8 = 4;

/// One database record. Owned by exactly one worker while being scanned;
/// never mutated after creation.
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    pub id: String,
    /// Global input-order index, used for deterministic tie-breaking.
    pub idx: u32,
    /// Encoded residues, forward strand.
    pub residues: Vec<u8>,
}

impl SequenceRecord {
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Encoded reverse complement (minus-strand view).
    pub fn revcomp(&self) -> Vec<u8> {
        revcomp(&self.residues)
    }
}

/// Encode one residue byte, normalizing case and T→U.
#[inline]
pub fn encode_residue(b: u8) -> Option<u8> {
    match b.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'U' | b'T' => Some(3),
        b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'D' | b'H' | b'V' | b'N' => Some(AMBIG),
        _ => None,
    }
}

/// Render an encoded residue for alignment traces.
pub fn decode_residue(code: u8) -> char {
    match code {
        0 => 'A',
        1 => 'C',
        2 => 'G',
        3 => 'U',
        _ => 'N',
    }
}

/// Reverse complement over encoded residues. A<->U and C<->G are index
/// complements (3 - code); ambiguity stays ambiguous.
pub fn revcomp(residues: &[u8]) -> Vec<u8> {
    residues
        .iter()
        .rev()
        .map(|&r| if r < 4 { 3 - r } else { AMBIG })
        .collect()
}

/// Lazy multi-file record source. Files are opened one at a time; each call
/// to [`SequenceSource::next_file`] parses the next input fully so the
/// caller can fan its records out across workers as one static partition.
pub struct SequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    next_record_idx: u32,
}

/// One parsed input file.
#[derive(Debug)]
pub struct FileBatch {
    pub path: PathBuf,
    pub records: Vec<SequenceRecord>,
}

impl SequenceSource {
    pub fn open(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: 0,
            next_record_idx: 0,
        }
    }

    /// Parse the next input file. Returns `None` when all inputs are
    /// exhausted. An `Err` covers only the failing file; the source remains
    /// usable for the remaining inputs.
    pub fn next_file(&mut self) -> Option<Result<FileBatch, SequenceError>> {
        let path = self.paths.get(self.next)?.clone();
        self.next += 1;
        match read_records(&path, self.next_record_idx) {
            Ok(records) => {
                self.next_record_idx += records.len() as u32;
                Some(Ok(FileBatch { path, records }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

fn read_records(path: &Path, base_idx: u32) -> Result<Vec<SequenceRecord>, SequenceError> {
    let file = File::open(path).map_err(|source| SequenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = fasta::Reader::new(file);
    let mut records = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let rec = rec.map_err(|e| SequenceError::Parse {
            path: path.to_path_buf(),
            record: format!("#{}", i + 1),
            reason: e.to_string(),
        })?;
        if rec.id().is_empty() {
            return Err(SequenceError::Parse {
                path: path.to_path_buf(),
                record: format!("#{}", i + 1),
                reason: "empty record identifier".to_string(),
            });
        }
        let mut residues = Vec::with_capacity(rec.seq().len());
        for &b in rec.seq() {
            match encode_residue(b) {
                Some(code) => residues.push(code),
                None => {
                    return Err(SequenceError::Parse {
                        path: path.to_path_buf(),
                        record: rec.id().to_string(),
                        reason: format!("invalid residue '{}'", b as char),
                    })
                }
            }
        }
        records.push(SequenceRecord {
            id: rec.id().to_string(),
            idx: base_idx + i as u32,
            residues,
        });
    }
    Ok(records)
}
