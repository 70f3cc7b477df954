//! In-memory covariance model representation.
//!
//! The grammar is stored as an arena of states indexed by `usize`, with
//! transition targets held as index arrays. Apart from insert self-loops,
//! every transition points to a higher-numbered state, so the banded DP can
//! sweep the arena once in reverse order. The model is immutable after
//! loading and shared read-only across workers.

pub mod parser;
pub mod validate;

pub use parser::load;
pub use validate::{validate, ValidationReport};

/// Nucleotide symbol set the model was built over. Search input is
/// normalized to RNA either way; the alphabet only controls rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    #[default]
    Rna,
    Dna,
}

/// Structural unit in the consensus secondary-structure tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Root,
    MatL,
    MatR,
    MatP,
    Bif,
    BegL,
    BegR,
    End,
}

impl NodeType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "ROOT" => NodeType::Root,
            "MATL" => NodeType::MatL,
            "MATR" => NodeType::MatR,
            "MATP" => NodeType::MatP,
            "BIF" => NodeType::Bif,
            "BEGL" => NodeType::BegL,
            "BEGR" => NodeType::BegR,
            "END" => NodeType::End,
            _ => return None,
        })
    }
}

/// Grammar state kind. Emitting kinds consume residues from the left (ML,
/// IL), the right (MR, IR) or both ends at once (MP); S, D and B consume
/// nothing; E terminates a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateType {
    S,
    E,
    B,
    Ml,
    Mr,
    Mp,
    Il,
    Ir,
    D,
}

impl StateType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "S" => StateType::S,
            "E" => StateType::E,
            "B" => StateType::B,
            "ML" => StateType::Ml,
            "MR" => StateType::Mr,
            "MP" => StateType::Mp,
            "IL" => StateType::Il,
            "IR" => StateType::Ir,
            "D" => StateType::D,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::S => "S",
            StateType::E => "E",
            StateType::B => "B",
            StateType::Ml => "ML",
            StateType::Mr => "MR",
            StateType::Mp => "MP",
            StateType::Il => "IL",
            StateType::Ir => "IR",
            StateType::D => "D",
        }
    }

    /// Residues consumed per visit (left + right).
    pub fn emitted(&self) -> usize {
        match self {
            StateType::Mp => 2,
            StateType::Ml | StateType::Mr | StateType::Il | StateType::Ir => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub idx: usize,
    pub ty: NodeType,
}

/// One grammar state. Emission and transition scores are log-odds bits
/// relative to the null model, converted from probabilities at load time.
#[derive(Debug, Clone)]
pub struct State {
    pub idx: usize,
    pub node: usize,
    pub ty: StateType,
    /// 4 entries for single-emitting states, 16 (row-major left x right)
    /// for MP, empty otherwise.
    pub emit: Vec<f32>,
    /// (target state, transition score in bits). Empty for E and B.
    pub trans: Vec<(usize, f32)>,
    /// Left and right begin-state children of a B state.
    pub split: Option<(usize, usize)>,
}

/// Background residue distribution used for log-odds normalization.
#[derive(Debug, Clone)]
pub struct NullModel {
    pub freqs: [f64; 4],
}

impl Default for NullModel {
    fn default() -> Self {
        Self {
            freqs: [0.25; 4],
        }
    }
}

/// Gumbel tail parameters fitted during model calibration; converts raw bit
/// scores to E-values against a database of known size.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub lambda: f64,
    pub mu: f64,
    /// Residue count the calibration search space is normalized to.
    pub eff_seqlen: f64,
}

/// Linear profile HMM attached to the model for pre-filtering. One row of
/// match log-odds scores per consensus column.
#[derive(Debug, Clone)]
pub struct FilterHmm {
    pub match_scores: Vec<[f32; 4]>,
    /// Permissive admission threshold in bits.
    pub threshold: f32,
}

#[derive(Debug, Clone)]
pub struct Cm {
    pub name: String,
    pub accession: Option<String>,
    pub description: Option<String>,
    pub alphabet: Alphabet,
    /// Consensus length in residues.
    pub clen: usize,
    pub nodes: Vec<Node>,
    pub states: Vec<State>,
    /// Consensus residue string, kept for filter-HMM projection.
    pub consensus: Option<String>,
    pub null_model: NullModel,
    pub calibration: Option<Calibration>,
    pub filter_hmm: Option<FilterHmm>,
}

impl Cm {
    /// Emission score in bits for a single-emitting state. Ambiguous
    /// residues (code >= 4) score a flat penalty rather than NEG_INFINITY
    /// so a lone N cannot veto an otherwise strong parse.
    #[inline]
    pub fn emit_score(&self, state: usize, res: u8) -> f32 {
        if res >= 4 {
            return AMBIG_SCORE;
        }
        self.states[state].emit[res as usize]
    }

    /// Pair emission score in bits for an MP state.
    #[inline]
    pub fn pair_score(&self, state: usize, left: u8, right: u8) -> f32 {
        if left >= 4 || right >= 4 {
            return 2.0 * AMBIG_SCORE;
        }
        self.states[state].emit[left as usize * 4 + right as usize]
    }

    /// States a truncated parse may begin in: the first state of every
    /// match or bifurcation node.
    pub fn local_begin_states(&self) -> Vec<usize> {
        let mut seen_node = vec![false; self.nodes.len()];
        let mut begins = Vec::new();
        for st in &self.states {
            if seen_node[st.node] {
                continue;
            }
            seen_node[st.node] = true;
            match self.nodes[st.node].ty {
                NodeType::MatL | NodeType::MatR | NodeType::MatP | NodeType::Bif => {
                    begins.push(st.idx)
                }
                _ => {}
            }
        }
        begins
    }
}

/// Flat score for ambiguous residues, in bits.
pub const AMBIG_SCORE: f32 = -1.0;
