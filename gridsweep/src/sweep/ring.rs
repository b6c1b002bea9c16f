//! Ring closure search
//!
//! For every tie candidate left by the energization sweeps, walk from its
//! unexplored node until another energized switching element, or one native
//! to another circuit, is met. That element is where a loop would form if
//! the tie were closed. The search only
//! reads phase-1 rows; it never adds or restructures them.

use std::collections::{HashMap, HashSet};

use crate::network::{NetworkTopology, SwitchingElement};
use crate::results::{RingClosure, RingKind, SwitchingElementResult};

use super::energization::CircuitSweep;

/// Default bound on expanded nodes per search
pub const DEFAULT_MAX_RING_STEPS: usize = 200;

/// Read-only index of every phase-1 switching element row, all circuits
#[derive(Debug, Default)]
pub struct EnergizedIndex<'a> {
    rows: HashMap<&'a str, Vec<&'a SwitchingElementResult>>,
}

impl<'a> EnergizedIndex<'a> {
    pub fn new(sweeps: &'a [CircuitSweep]) -> Self {
        let mut rows: HashMap<&'a str, Vec<&'a SwitchingElementResult>> = HashMap::new();
        for sweep in sweeps {
            for row in &sweep.switching_elements {
                rows.entry(row.element.id.as_str()).or_default().push(row);
            }
        }
        Self { rows }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// The row that best describes where `element` is fed from: the one
    /// produced by its own circuit's sweep, else the first one recorded.
    pub fn energizing_row(&self, element: &SwitchingElement) -> Option<&'a SwitchingElementResult> {
        let rows = self.rows.get(element.id.as_str())?;
        rows.iter()
            .find(|r| r.origin_circuit == element.native_circuit)
            .or_else(|| rows.first())
            .copied()
    }
}

/// Outcome of one ring search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingSearch {
    Found(RingClosure),
    /// Every path ended without meeting energized equipment
    DeadEnd { steps: usize },
    /// The step bound was reached first
    StepLimit { steps: usize },
}

impl RingSearch {
    pub fn closure(self) -> Option<RingClosure> {
        match self {
            RingSearch::Found(closure) => Some(closure),
            _ => None,
        }
    }
}

/// Search from `ring_node`, the unexplored side of the tie element at
/// `tie_index`, found by the sweep of `origin_circuit`.
pub fn search_ring_closure(
    topology: &NetworkTopology<'_>,
    energized: &EnergizedIndex<'_>,
    tie_index: usize,
    ring_node: &str,
    origin_circuit: &str,
    max_steps: usize,
) -> RingSearch {
    let tie = topology.switching_element(tie_index);
    let is_known_circuit = |name: &str| topology.dataset().circuits.iter().any(|c| c.name == name);

    let mut stack = vec![ring_node.to_string()];
    let mut visited_nodes: HashSet<String> = HashSet::new();
    let mut crossed_lines: HashSet<usize> = HashSet::new();
    let mut crossed_elements: HashSet<usize> = HashSet::new();
    let mut steps = 0;

    while let Some(node) = stack.pop() {
        if !visited_nodes.insert(node.clone()) {
            continue;
        }
        if steps >= max_steps {
            return RingSearch::StepLimit { steps };
        }
        steps += 1;

        let touching: Vec<usize> = topology
            .switching_elements_at(&node)
            .into_iter()
            .filter(|&idx| idx != tie_index && topology.switching_element(idx).id != tie.id)
            .collect();

        // Energized equipment closes the ring, whatever its state or circuit
        for &idx in &touching {
            if let Some(row) = energized.energizing_row(topology.switching_element(idx)) {
                let kind = if row.origin_circuit == origin_circuit {
                    RingKind::Internal
                } else {
                    RingKind::External
                };
                return RingSearch::Found(RingClosure {
                    equipment_id: row.element.id.clone(),
                    equipment_code: row.element.operational_code.clone(),
                    circuit: row.origin_circuit.clone(),
                    upstream_path: row.upstream_path.clone(),
                    kind,
                });
            }
        }

        // Unenergized equipment of another known circuit still marks a tie
        for &idx in &touching {
            let element = topology.switching_element(idx);
            if element.native_circuit != origin_circuit && is_known_circuit(element.native_circuit.as_str()) {
                return RingSearch::Found(RingClosure {
                    equipment_id: element.id.clone(),
                    equipment_code: element.operational_code.clone(),
                    circuit: element.native_circuit.clone(),
                    upstream_path: Vec::new(),
                    kind: RingKind::External,
                });
            }
        }

        for line_index in topology.lines_at(&node) {
            if !crossed_lines.insert(line_index) {
                continue;
            }
            if let Some(far) = topology.line(line_index).far_node(&node) {
                stack.push(far.to_string());
            }
        }

        // Unenergized switches: closed ones are crossed, open ones end the path
        for idx in touching {
            let element = topology.switching_element(idx);
            if !element.stable_state.is_closed() || !crossed_elements.insert(idx) {
                continue;
            }
            if let Some(far) = element.far_node(&node) {
                stack.push(far.to_string());
            }
        }
    }

    RingSearch::DeadEnd { steps }
}

/// Counts of a ring-search pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingPassStats {
    pub searched: usize,
    pub found: usize,
    pub dead_ends: usize,
    pub step_limited: usize,
}

/// Run the ring search for every tie candidate of every sweep and annotate
/// the candidate rows. Must only be called once all sweeps are complete.
pub fn annotate_ring_closures(
    topology: &NetworkTopology<'_>,
    sweeps: &mut [CircuitSweep],
    max_steps: usize,
) -> RingPassStats {
    let mut stats = RingPassStats::default();

    let annotations: Vec<(usize, usize, Option<RingClosure>)> = {
        let energized = EnergizedIndex::new(sweeps);
        let mut annotations = Vec::new();

        for (sweep_index, sweep) in sweeps.iter().enumerate() {
            for candidate in &sweep.tie_candidates {
                let tie = topology.switching_element(candidate.element_index);
                let outcome = search_ring_closure(
                    topology,
                    &energized,
                    candidate.element_index,
                    &candidate.ring_node,
                    &sweep.circuit,
                    max_steps,
                );
                stats.searched += 1;

                match &outcome {
                    RingSearch::Found(closure) => {
                        stats.found += 1;
                        tracing::debug!(
                            "Circuit {}: tie '{}' closes {} ring with '{}' of circuit {}",
                            sweep.circuit,
                            tie.operational_code,
                            closure.kind.as_str(),
                            closure.equipment_code,
                            closure.circuit
                        );
                    }
                    RingSearch::DeadEnd { .. } => {
                        stats.dead_ends += 1;
                        tracing::debug!(
                            "Circuit {}: no ring closure behind tie '{}' (node {})",
                            sweep.circuit,
                            tie.operational_code,
                            candidate.ring_node
                        );
                    }
                    RingSearch::StepLimit { steps } => {
                        stats.step_limited += 1;
                        tracing::warn!(
                            "Circuit {}: ring search from tie '{}' stopped after {} steps",
                            sweep.circuit,
                            tie.operational_code,
                            steps
                        );
                    }
                }

                annotations.push((sweep_index, candidate.row, outcome.closure()));
            }
        }
        annotations
    };

    for (sweep_index, row, closure) in annotations {
        sweeps[sweep_index].switching_elements[row].ring_closure = closure;
    }

    stats
}
