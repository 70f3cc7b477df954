//! Non-destructive model consistency checking.
//!
//! `validate` walks the whole model and enumerates every violation instead
//! of stopping at the first, so the `validate` subcommand can print a full
//! report. The loader reuses the same checks and fails on the first entry.

use crate::model::{Cm, NodeType, StateType};

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub violations: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, v: String) {
        self.violations.push(v);
    }
}

pub fn validate(cm: &Cm) -> ValidationReport {
    let mut report = ValidationReport::default();
    let n = cm.states.len();

    if cm.states.is_empty() {
        report.push("model has no states".to_string());
        return report;
    }
    if cm.nodes.is_empty() {
        report.push("model has no nodes".to_string());
        return report;
    }

    if cm.states[0].ty != StateType::S || cm.nodes[cm.states[0].node].ty != NodeType::Root {
        report.push("state 0 must be the S state of the ROOT node".to_string());
    }

    let mut referenced = vec![false; n];
    referenced[0] = true;

    for st in &cm.states {
        if st.node >= cm.nodes.len() {
            report.push(format!("state {} references missing node {}", st.idx, st.node));
        }

        for &(target, _) in &st.trans {
            if target >= n {
                report.push(format!(
                    "state {} transition targets missing state {target}",
                    st.idx
                ));
                continue;
            }
            referenced[target] = true;
            // Insert self-loops are the only permitted cycles.
            let self_loop_ok =
                target == st.idx && matches!(st.ty, StateType::Il | StateType::Ir);
            if target < st.idx || (target == st.idx && !self_loop_ok) {
                report.push(format!(
                    "state {} has a backward transition to state {target}",
                    st.idx
                ));
            }
        }

        match st.ty {
            StateType::B => {
                match st.split {
                    Some((l, r)) => {
                        for child in [l, r] {
                            if child >= n {
                                report.push(format!(
                                    "B state {} child {child} is missing",
                                    st.idx
                                ));
                            } else {
                                referenced[child] = true;
                                let begin_ok = cm.states[child].ty == StateType::S
                                    && matches!(
                                        cm.nodes.get(cm.states[child].node).map(|nd| nd.ty),
                                        Some(NodeType::BegL) | Some(NodeType::BegR)
                                    );
                                if !begin_ok {
                                    report.push(format!(
                                        "B state {} child {child} is not a BEGL/BEGR begin state",
                                        st.idx
                                    ));
                                }
                                if child <= st.idx {
                                    report.push(format!(
                                        "B state {} child {child} does not follow it",
                                        st.idx
                                    ));
                                }
                            }
                        }
                    }
                    None => report.push(format!("B state {} has no split children", st.idx)),
                }
                if !st.trans.is_empty() {
                    report.push(format!("B state {} must not carry transitions", st.idx));
                }
            }
            StateType::E => {
                if !st.trans.is_empty() {
                    report.push(format!("E state {} must not carry transitions", st.idx));
                }
            }
            _ => {
                if st.trans.is_empty() {
                    report.push(format!(
                        "state {} ({}) has no outgoing transitions",
                        st.idx,
                        st.ty.as_str()
                    ));
                }
                if st.split.is_some() {
                    report.push(format!("non-B state {} carries split children", st.idx));
                }
            }
        }

        let expected_emit = match st.ty {
            StateType::Mp => 16,
            StateType::Ml | StateType::Mr | StateType::Il | StateType::Ir => 4,
            _ => 0,
        };
        if st.emit.len() != expected_emit {
            report.push(format!(
                "state {} ({}) has {} emission scores, expected {expected_emit}",
                st.idx,
                st.ty.as_str(),
                st.emit.len()
            ));
        }
    }

    for (idx, seen) in referenced.iter().enumerate() {
        if !seen {
            report.push(format!("state {idx} is unreachable"));
        }
    }

    // Pair nodes must actually carry a pair state; this is what keeps the
    // secondary-structure tree honest about which columns are paired.
    for node in &cm.nodes {
        if node.ty == NodeType::MatP
            && !cm
                .states
                .iter()
                .any(|s| s.node == node.idx && s.ty == StateType::Mp)
        {
            report.push(format!("MATP node {} has no MP state", node.idx));
        }
    }

    if let Some(cons) = &cm.consensus {
        if cons.len() != cm.clen {
            report.push(format!(
                "consensus string length {} disagrees with CLEN {}",
                cons.len(),
                cm.clen
            ));
        }
    }

    if let Some(fhmm) = &cm.filter_hmm {
        if fhmm.match_scores.len() != cm.clen {
            report.push(format!(
                "filter HMM has {} columns, expected CLEN {}",
                fhmm.match_scores.len(),
                cm.clen
            ));
        }
    }

    report
}
