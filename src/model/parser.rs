//! Covariance model file loader.
//!
//! The on-disk format is line oriented: a header block (`NAME`, `ACC`,
//! `DESC`, `ALPH`, `CLEN`, `STATES`, `NODES`, optional `GUMBEL`, `NULL`,
//! optional `CONS`), a body of `NODE` and `STATE` lines, an optional `FHMM`
//! filter block, terminated by `//`. Probabilities in the file are converted
//! to log-odds bit scores against the null model here, once, so the DP
//! engine only ever sees bits.

use std::path::Path;

use crate::error::ModelError;
use crate::model::{
    Alphabet, Calibration, Cm, FilterHmm, Node, NodeType, NullModel, State, StateType,
};

const MAGIC: &str = "COVSCAN-CM";
const SUPPORTED_VERSION: u32 = 1;
/// Tolerance on probability row sums before log-odds conversion.
const PROB_SUM_TOL: f64 = 1e-3;

/// Load and check a model file. Probability rows that do not sum to 1 and
/// count mismatches against the declared `STATES`/`NODES` headers are
/// reported as checksum failures, not format failures.
pub fn load(path: &Path) -> Result<Cm, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Parser::new(path, &content).parse()
}

struct Parser<'a> {
    path: &'a Path,
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(path: &'a Path, content: &'a str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
            .collect();
        Self {
            path,
            lines,
            pos: 0,
        }
    }

    fn format_err(&self, line: usize, reason: impl Into<String>) -> ModelError {
        ModelError::Format {
            path: self.path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    fn checksum_err(&self, reason: impl Into<String>) -> ModelError {
        ModelError::Checksum {
            path: self.path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let l = self.peek();
        if l.is_some() {
            self.pos += 1;
        }
        l
    }

    fn parse(mut self) -> Result<Cm, ModelError> {
        let (lineno, magic) = self
            .next()
            .ok_or_else(|| self.format_err(0, "empty model file"))?;
        let mut it = magic.split_whitespace();
        if it.next() != Some(MAGIC) {
            return Err(self.format_err(lineno, format!("missing {MAGIC} magic header")));
        }
        let version: u32 = it
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| self.format_err(lineno, "missing format version"))?;
        if version != SUPPORTED_VERSION {
            return Err(ModelError::UnsupportedFeature {
                path: self.path.to_path_buf(),
                feature: format!("format version {version}"),
            });
        }

        let header = self.parse_header()?;
        let (nodes, states) = self.parse_body(header.n_states, header.n_nodes, &header.null)?;
        let filter_hmm = self.parse_fhmm(header.clen, &header.null)?;
        self.expect_terminator()?;

        let cm = Cm {
            name: header
                .name
                .ok_or_else(|| self.checksum_err("missing NAME header"))?,
            accession: header.accession,
            description: header.description,
            alphabet: header.alphabet,
            clen: header.clen,
            nodes,
            states,
            consensus: header.consensus,
            null_model: header.null,
            calibration: header.calibration,
            filter_hmm,
        };
        self.check(&cm, header.n_states, header.n_nodes)?;
        Ok(cm)
    }

    fn parse_header(&mut self) -> Result<Header, ModelError> {
        let mut h = Header::default();
        while let Some((lineno, line)) = self.peek() {
            let mut fields = line.split_whitespace();
            let key = fields.next().unwrap_or("");
            if key == "NODE" {
                break;
            }
            self.pos += 1;
            let rest: Vec<&str> = fields.collect();
            match key {
                "NAME" => h.name = Some(self.one_field(lineno, &rest, "NAME")?.to_string()),
                "ACC" => h.accession = Some(self.one_field(lineno, &rest, "ACC")?.to_string()),
                "DESC" => h.description = Some(rest.join(" ")),
                "ALPH" => {
                    h.alphabet = match *rest.first().unwrap_or(&"") {
                        "RNA" => Alphabet::Rna,
                        "DNA" => Alphabet::Dna,
                        other => {
                            return Err(ModelError::UnsupportedFeature {
                                path: self.path.to_path_buf(),
                                feature: format!("alphabet '{other}'"),
                            })
                        }
                    }
                }
                "CLEN" => h.clen = self.parse_num(lineno, self.one_field(lineno, &rest, "CLEN")?)?,
                "STATES" => {
                    h.n_states = self.parse_num(lineno, self.one_field(lineno, &rest, "STATES")?)?
                }
                "NODES" => {
                    h.n_nodes = self.parse_num(lineno, self.one_field(lineno, &rest, "NODES")?)?
                }
                "CONS" => h.consensus = Some(self.one_field(lineno, &rest, "CONS")?.to_string()),
                "GUMBEL" => {
                    if rest.len() != 3 {
                        return Err(
                            self.format_err(lineno, "GUMBEL expects: lambda mu eff-seqlen")
                        );
                    }
                    h.calibration = Some(Calibration {
                        lambda: self.parse_num(lineno, rest[0])?,
                        mu: self.parse_num(lineno, rest[1])?,
                        eff_seqlen: self.parse_num(lineno, rest[2])?,
                    });
                }
                "NULL" => {
                    if rest.len() != 4 {
                        return Err(self.format_err(lineno, "NULL expects 4 frequencies"));
                    }
                    let mut freqs = [0.0f64; 4];
                    for (slot, f) in freqs.iter_mut().zip(&rest) {
                        *slot = self.parse_num(lineno, f)?;
                    }
                    let sum: f64 = freqs.iter().sum();
                    if (sum - 1.0).abs() > PROB_SUM_TOL {
                        return Err(
                            self.checksum_err(format!("NULL frequencies sum to {sum:.4}, not 1"))
                        );
                    }
                    h.null = NullModel { freqs };
                }
                other => {
                    return Err(self.format_err(lineno, format!("unknown header key '{other}'")))
                }
            }
        }
        if h.clen == 0 {
            return Err(self.checksum_err("missing or zero CLEN header"));
        }
        Ok(h)
    }

    fn parse_body(
        &mut self,
        n_states: usize,
        n_nodes: usize,
        null: &NullModel,
    ) -> Result<(Vec<Node>, Vec<State>), ModelError> {
        let mut nodes: Vec<Node> = Vec::with_capacity(n_nodes);
        let mut states: Vec<State> = Vec::with_capacity(n_states);
        while let Some((lineno, line)) = self.peek() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.first().copied() {
                Some("NODE") => {
                    self.pos += 1;
                    if fields.len() != 3 {
                        return Err(self.format_err(lineno, "NODE expects: index type"));
                    }
                    let idx: usize = self.parse_num(lineno, fields[1])?;
                    let ty = NodeType::parse(fields[2]).ok_or_else(|| {
                        ModelError::UnsupportedFeature {
                            path: self.path.to_path_buf(),
                            feature: format!("node type '{}'", fields[2]),
                        }
                    })?;
                    if idx != nodes.len() {
                        return Err(self.checksum_err(format!(
                            "node index {idx} out of order (expected {})",
                            nodes.len()
                        )));
                    }
                    nodes.push(Node { idx, ty });
                }
                Some("STATE") => {
                    self.pos += 1;
                    let state = self.parse_state(lineno, &fields, states.len(), null)?;
                    states.push(state);
                }
                _ => break,
            }
        }
        Ok((nodes, states))
    }

    /// `STATE <idx> <type> <node> [emission probs] [-> t:p ... | -> left right]`
    fn parse_state(
        &self,
        lineno: usize,
        fields: &[&str],
        expected_idx: usize,
        null: &NullModel,
    ) -> Result<State, ModelError> {
        if fields.len() < 4 {
            return Err(self.format_err(lineno, "STATE expects: index type node ..."));
        }
        let idx: usize = self.parse_num(lineno, fields[1])?;
        if idx != expected_idx {
            return Err(self.checksum_err(format!(
                "state index {idx} out of order (expected {expected_idx})"
            )));
        }
        let ty = StateType::parse(fields[2]).ok_or_else(|| ModelError::UnsupportedFeature {
            path: self.path.to_path_buf(),
            feature: format!("state type '{}'", fields[2]),
        })?;
        let node: usize = self.parse_num(lineno, fields[3])?;

        let arrow = fields.iter().position(|f| *f == "->");
        let emit_fields = &fields[4..arrow.unwrap_or(fields.len())];
        let n_emit = match ty {
            StateType::Mp => 16,
            StateType::Ml | StateType::Mr | StateType::Il | StateType::Ir => 4,
            _ => 0,
        };
        if emit_fields.len() != n_emit {
            return Err(self.format_err(
                lineno,
                format!(
                    "state {idx} ({}) expects {n_emit} emission probabilities, found {}",
                    ty.as_str(),
                    emit_fields.len()
                ),
            ));
        }
        let mut probs = Vec::with_capacity(n_emit);
        for f in emit_fields {
            probs.push(self.parse_num::<f64>(lineno, f)?);
        }
        if n_emit > 0 {
            let sum: f64 = probs.iter().sum();
            if (sum - 1.0).abs() > PROB_SUM_TOL {
                return Err(self.checksum_err(format!(
                    "state {idx} emission probabilities sum to {sum:.4}, not 1"
                )));
            }
        }
        let emit = match ty {
            StateType::Mp => probs
                .iter()
                .enumerate()
                .map(|(k, &p)| log_odds(p, null.freqs[k / 4] * null.freqs[k % 4]))
                .collect(),
            _ => probs
                .iter()
                .enumerate()
                .map(|(k, &p)| log_odds(p, null.freqs[k]))
                .collect(),
        };

        let mut trans = Vec::new();
        let mut split = None;
        if let Some(a) = arrow {
            let targets = &fields[a + 1..];
            if ty == StateType::B {
                if targets.len() != 2 {
                    return Err(
                        self.format_err(lineno, format!("B state {idx} expects two children"))
                    );
                }
                split = Some((
                    self.parse_num(lineno, targets[0])?,
                    self.parse_num(lineno, targets[1])?,
                ));
            } else {
                let mut sum = 0.0f64;
                for t in targets {
                    let (target, prob) = t.split_once(':').ok_or_else(|| {
                        self.format_err(lineno, format!("bad transition '{t}' (expected t:p)"))
                    })?;
                    let target: usize = self.parse_num(lineno, target)?;
                    let prob: f64 = self.parse_num(lineno, prob)?;
                    sum += prob;
                    trans.push((target, prob.log2() as f32));
                }
                if (sum - 1.0).abs() > PROB_SUM_TOL {
                    return Err(self.checksum_err(format!(
                        "state {idx} transition probabilities sum to {sum:.4}, not 1"
                    )));
                }
            }
        } else if ty != StateType::E {
            return Err(self.checksum_err(format!(
                "non-terminal state {idx} ({}) has no transitions",
                ty.as_str()
            )));
        }

        Ok(State {
            idx,
            node,
            ty,
            emit,
            trans,
            split,
        })
    }

    fn parse_fhmm(
        &mut self,
        clen: usize,
        null: &NullModel,
    ) -> Result<Option<FilterHmm>, ModelError> {
        let Some((lineno, line)) = self.peek() else {
            return Ok(None);
        };
        if !line.starts_with("FHMM") {
            return Ok(None);
        }
        self.pos += 1;
        let threshold: f32 = line
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| self.format_err(lineno, "FHMM expects a bit threshold"))?;
        let mut match_scores = Vec::with_capacity(clen);
        for _ in 0..clen {
            let (lineno, row) = self
                .next()
                .ok_or_else(|| self.checksum_err("FHMM block shorter than CLEN"))?;
            let fields: Vec<&str> = row.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(self.format_err(lineno, "FHMM row expects 4 probabilities"));
            }
            let mut probs = [0.0f64; 4];
            for (slot, f) in probs.iter_mut().zip(&fields) {
                *slot = self.parse_num(lineno, f)?;
            }
            let sum: f64 = probs.iter().sum();
            if (sum - 1.0).abs() > PROB_SUM_TOL {
                return Err(self.checksum_err(format!("FHMM row sums to {sum:.4}, not 1")));
            }
            let mut scores = [0.0f32; 4];
            for k in 0..4 {
                scores[k] = log_odds(probs[k], null.freqs[k]);
            }
            match_scores.push(scores);
        }
        Ok(Some(FilterHmm {
            match_scores,
            threshold,
        }))
    }

    fn expect_terminator(&mut self) -> Result<(), ModelError> {
        match self.next() {
            Some((_, "//")) => Ok(()),
            Some((lineno, line)) => {
                Err(self.format_err(lineno, format!("expected '//' terminator, found '{line}'")))
            }
            None => Err(self.format_err(0, "missing '//' terminator")),
        }
    }

    /// Load-time consistency checks. `validate()` repeats these
    /// non-destructively for the `validate` subcommand.
    fn check(&self, cm: &Cm, n_states: usize, n_nodes: usize) -> Result<(), ModelError> {
        if cm.states.len() != n_states {
            return Err(self.checksum_err(format!(
                "STATES header declares {n_states}, body has {}",
                cm.states.len()
            )));
        }
        if cm.nodes.len() != n_nodes {
            return Err(self.checksum_err(format!(
                "NODES header declares {n_nodes}, body has {}",
                cm.nodes.len()
            )));
        }
        let report = super::validate(cm);
        if let Some(first) = report.violations.first() {
            return Err(self.checksum_err(first.clone()));
        }
        Ok(())
    }

    fn one_field<'b>(
        &self,
        lineno: usize,
        rest: &[&'b str],
        key: &str,
    ) -> Result<&'b str, ModelError> {
        rest.first()
            .copied()
            .ok_or_else(|| self.format_err(lineno, format!("{key} expects a value")))
    }

    fn parse_num<T: std::str::FromStr>(&self, lineno: usize, s: &str) -> Result<T, ModelError> {
        s.parse()
            .map_err(|_| self.format_err(lineno, format!("cannot parse '{s}'")))
    }
}

#[derive(Default)]
struct Header {
    name: Option<String>,
    accession: Option<String>,
    description: Option<String>,
    alphabet: Alphabet,
    clen: usize,
    n_states: usize,
    n_nodes: usize,
    consensus: Option<String>,
    null: NullModel,
    calibration: Option<Calibration>,
}

/// log2(p / bg), with probability zero mapped to negative infinity.
fn log_odds(p: f64, bg: f64) -> f32 {
    if p <= 0.0 {
        f32::NEG_INFINITY
    } else {
        (p / bg).log2() as f32
    }
}
