//! Energization sweep
//!
//! Depth-first walk from a circuit's breaker through line segments and
//! closed switching elements. Every reached element gets one row carrying the
//! nearest enclosing closed switch (its parent) and the chain of switch codes
//! back to the breaker. Open switches end their branch and are remembered as
//! tie candidates for the ring search.

use std::collections::HashSet;
use thiserror::Error;

use crate::network::{EquipmentRef, NetworkTopology, SwitchState};
use crate::results::{LineResult, SwitchingElementResult, TransformerResult, UpstreamPath};

/// Errors that stop the sweep of a single circuit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    #[error("no breaker with operational code '{circuit}'")]
    MissingBreaker { circuit: String },
}

/// An open switching element whose far side was left unexplored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieCandidate {
    /// Index of the element's row in [`CircuitSweep::switching_elements`]
    pub row: usize,
    /// Index of the element in the dataset
    pub element_index: usize,
    pub ring_node: String,
}

/// Private result buffer of one circuit's sweep
#[derive(Debug, Clone, Default)]
pub struct CircuitSweep {
    pub circuit: String,
    pub switching_elements: Vec<SwitchingElementResult>,
    pub lines: Vec<LineResult>,
    pub transformers: Vec<TransformerResult>,
    pub tie_candidates: Vec<TieCandidate>,
}

impl CircuitSweep {
    fn new(circuit: &str) -> Self {
        Self {
            circuit: circuit.to_string(),
            ..Default::default()
        }
    }
}

/// Exploration state pushed on the stack
#[derive(Debug)]
struct Frame {
    arrived_via: EquipmentRef,
    node: String,
    parent: String,
    path: UpstreamPath,
}

/// Ids already emitted during this circuit's sweep
#[derive(Debug, Default)]
struct Visited<'a> {
    switching_elements: HashSet<&'a str>,
    lines: HashSet<&'a str>,
    transformers: HashSet<&'a str>,
}

/// Sweep one circuit, starting at its breaker's node2.
///
/// Node1 of the breaker is the source side and is never explored. Elements
/// native to another circuit are treated as open for the whole sweep.
pub fn sweep_circuit(topology: &NetworkTopology<'_>, circuit: &str) -> Result<CircuitSweep, SweepError> {
    let dataset = topology.dataset();
    let (breaker_index, breaker) = dataset
        .breaker_for(circuit)
        .ok_or_else(|| SweepError::MissingBreaker {
            circuit: circuit.to_string(),
        })?;

    let mut sweep = CircuitSweep::new(circuit);
    let mut visited = Visited::default();

    sweep.switching_elements.push(SwitchingElementResult {
        element: breaker.clone(),
        parent_operational_code: None,
        upstream_path: vec![circuit.to_string()],
        origin_circuit: circuit.to_string(),
        effective_state: breaker.stable_state,
        unexplored_ring_node: None,
        ring_closure: None,
    });
    visited.switching_elements.insert(breaker.id.as_str());

    let Some(start) = breaker.node2.as_deref().filter(|n| !n.is_empty()) else {
        tracing::warn!("Breaker '{}' of circuit {} has no node2; nothing to sweep", breaker.id, circuit);
        return Ok(sweep);
    };

    let mut stack = vec![Frame {
        arrived_via: EquipmentRef::switching_element(breaker_index),
        node: start.to_string(),
        parent: circuit.to_string(),
        path: vec![circuit.to_string()],
    }];

    while let Some(frame) = stack.pop() {
        // Lines: passive, same parent and path on the far side
        for line_index in topology.lines_at(&frame.node) {
            let line = topology.line(line_index);
            if !visited.lines.insert(line.id.as_str()) {
                continue;
            }

            sweep.lines.push(LineResult {
                line: line.clone(),
                parent_operational_code: Some(frame.parent.clone()),
                upstream_path: frame.path.clone(),
                origin_circuit: circuit.to_string(),
            });

            for node in line.nodes() {
                for transformer_index in topology.transformers_at(node) {
                    let transformer = topology.transformer(transformer_index);
                    if !visited.transformers.insert(transformer.id.as_str()) {
                        continue;
                    }
                    sweep.transformers.push(TransformerResult {
                        transformer: transformer.clone(),
                        parent_operational_code: Some(frame.parent.clone()),
                        upstream_path: frame.path.clone(),
                        origin_circuit: circuit.to_string(),
                        feeding_line_id: line.id.clone(),
                    });
                }
            }

            if let Some(far) = line.far_node(&frame.node) {
                stack.push(Frame {
                    arrived_via: EquipmentRef::line(line_index),
                    node: far.to_string(),
                    parent: frame.parent.clone(),
                    path: frame.path.clone(),
                });
            }
        }

        // Switching elements: closed ones deepen the hierarchy, open ones stop
        for element_index in topology.switching_elements_at(&frame.node) {
            if frame.arrived_via == EquipmentRef::switching_element(element_index) {
                continue;
            }
            let element = topology.switching_element(element_index);
            if !visited.switching_elements.insert(element.id.as_str()) {
                continue;
            }

            let effective_state = element.effective_state(circuit);
            let far = element.far_node(&frame.node);
            let row = sweep.switching_elements.len();

            sweep.switching_elements.push(SwitchingElementResult {
                element: element.clone(),
                parent_operational_code: Some(frame.parent.clone()),
                upstream_path: frame.path.clone(),
                origin_circuit: circuit.to_string(),
                effective_state,
                unexplored_ring_node: match effective_state {
                    SwitchState::Open => far.map(str::to_string),
                    SwitchState::Closed => None,
                },
                ring_closure: None,
            });

            match (effective_state, far) {
                (SwitchState::Closed, Some(far)) => {
                    let mut path = frame.path.clone();
                    path.push(element.operational_code.clone());
                    stack.push(Frame {
                        arrived_via: EquipmentRef::switching_element(element_index),
                        node: far.to_string(),
                        parent: element.operational_code.clone(),
                        path,
                    });
                }
                (SwitchState::Open, Some(far)) => {
                    tracing::debug!(
                        "Circuit {}: open element '{}' leaves node {} unexplored",
                        circuit,
                        element.operational_code,
                        far
                    );
                    sweep.tie_candidates.push(TieCandidate {
                        row,
                        element_index,
                        ring_node: far.to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    tracing::info!(
        "Circuit {}: {} switching elements, {} lines, {} transformers, {} open ties",
        circuit,
        sweep.switching_elements.len(),
        sweep.lines.len(),
        sweep.transformers.len(),
        sweep.tie_candidates.len()
    );

    Ok(sweep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LineSegment, NetworkDataset, SwitchingElement, Transformer};

    /// Breaker C1 at N1; L1 (N1-N2); closed S1 (N2-N3); open S2 (N3-N4)
    fn create_radial_dataset() -> NetworkDataset {
        let mut dataset = NetworkDataset::new();
        dataset.add_circuit("C1");
        dataset.add_switching_element(
            SwitchingElement::new("100", "C1", "C1")
                .with_type("BREAKER")
                .with_nodes("N0", "N1"),
        );
        dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N1", "N2"));
        dataset.add_switching_element(SwitchingElement::new("101", "S1", "C1").with_nodes("N2", "N3"));
        dataset.add_switching_element(SwitchingElement::new("102", "S2", "C1").with_nodes("N3", "N4").open());
        dataset
    }

    fn row<'a>(sweep: &'a CircuitSweep, id: &str) -> &'a SwitchingElementResult {
        sweep
            .switching_elements
            .iter()
            .find(|r| r.element.id == id)
            .unwrap()
    }

    #[test]
    fn test_radial_hierarchy() {
        let dataset = create_radial_dataset();
        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        let breaker = row(&sweep, "100");
        assert!(breaker.is_root());
        assert_eq!(breaker.upstream_path, vec!["C1"]);

        assert_eq!(sweep.lines.len(), 1);
        assert_eq!(sweep.lines[0].parent_operational_code.as_deref(), Some("C1"));
        assert_eq!(sweep.lines[0].upstream_path, vec!["C1"]);

        let s1 = row(&sweep, "101");
        assert_eq!(s1.parent_operational_code.as_deref(), Some("C1"));
        assert_eq!(s1.upstream_path, vec!["C1"]);
        assert!(s1.unexplored_ring_node.is_none());

        let s2 = row(&sweep, "102");
        assert_eq!(s2.parent_operational_code.as_deref(), Some("S1"));
        assert_eq!(s2.upstream_path, vec!["C1", "S1"]);
        assert_eq!(s2.effective_state, SwitchState::Open);
        assert_eq!(s2.unexplored_ring_node.as_deref(), Some("N4"));

        assert_eq!(sweep.tie_candidates.len(), 1);
        assert_eq!(sweep.tie_candidates[0].ring_node, "N4");
        assert_eq!(sweep.switching_elements[sweep.tie_candidates[0].row].element.id, "102");
    }

    #[test]
    fn test_breaker_source_side_is_not_explored() {
        let mut dataset = create_radial_dataset();
        dataset.add_line(LineSegment::new("L0", "C1").with_nodes("N-1", "N0"));

        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        assert!(sweep.lines.iter().all(|l| l.line.id != "L0"));
    }

    #[test]
    fn test_missing_breaker() {
        let dataset = create_radial_dataset();
        let topology = NetworkTopology::new(&dataset);

        let err = sweep_circuit(&topology, "C9").unwrap_err();
        assert_eq!(err, SweepError::MissingBreaker { circuit: "C9".to_string() });
    }

    #[test]
    fn test_breaker_without_node2_yields_root_only() {
        let mut dataset = NetworkDataset::new();
        let mut breaker = SwitchingElement::new("100", "C1", "C1");
        breaker.node1 = Some("N0".to_string());
        dataset.add_switching_element(breaker);

        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        assert_eq!(sweep.switching_elements.len(), 1);
        assert!(sweep.lines.is_empty());
    }

    #[test]
    fn test_foreign_closed_switch_is_treated_as_open() {
        let mut dataset = create_radial_dataset();
        dataset.add_switching_element(SwitchingElement::new("200", "X1", "C2").with_nodes("N2", "N7"));
        dataset.add_line(LineSegment::new("L7", "C2").with_nodes("N7", "N8"));

        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        let foreign = row(&sweep, "200");
        assert_eq!(foreign.effective_state, SwitchState::Open);
        assert_eq!(foreign.element.stable_state, SwitchState::Closed);
        assert_eq!(foreign.unexplored_ring_node.as_deref(), Some("N7"));
        assert!(sweep.lines.iter().all(|l| l.line.id != "L7"));
        // the dataset record itself is untouched
        assert_eq!(dataset.switching_elements[3].stable_state, SwitchState::Closed);
    }

    #[test]
    fn test_transformers_are_leaves() {
        let mut dataset = create_radial_dataset();
        dataset.add_transformer(Transformer::new("T1", "C1").with_code("TR-1").with_nodes("N2", "X1"));
        dataset.add_line(LineSegment::new("LX", "C1").with_nodes("X1", "X2"));

        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        assert_eq!(sweep.transformers.len(), 1);
        let t1 = &sweep.transformers[0];
        assert_eq!(t1.feeding_line_id, "L1");
        assert_eq!(t1.parent_operational_code.as_deref(), Some("C1"));
        assert_eq!(t1.upstream_path, vec!["C1"]);
        // nothing behind the transformer is energized
        assert!(sweep.lines.iter().all(|l| l.line.id != "LX"));
    }

    #[test]
    fn test_meshed_network_visits_each_element_once() {
        let mut dataset = NetworkDataset::new();
        dataset.add_switching_element(SwitchingElement::new("100", "C1", "C1").with_nodes("N0", "N1"));
        dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N1", "N2"));
        dataset.add_line(LineSegment::new("L2", "C1").with_nodes("N2", "N3"));
        dataset.add_line(LineSegment::new("L3", "C1").with_nodes("N3", "N1"));
        dataset.add_switching_element(SwitchingElement::new("101", "S1", "C1").with_nodes("N2", "N4"));
        dataset.add_switching_element(SwitchingElement::new("102", "S2", "C1").with_nodes("N3", "N4"));
        dataset.add_line(LineSegment::new("L4", "C1").with_nodes("N4", "N4"));

        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        let mut line_ids: Vec<&str> = sweep.lines.iter().map(|l| l.line.id.as_str()).collect();
        line_ids.sort_unstable();
        assert_eq!(line_ids, vec!["L1", "L2", "L3", "L4"]);

        let mut element_ids: Vec<&str> = sweep
            .switching_elements
            .iter()
            .map(|r| r.element.id.as_str())
            .collect();
        element_ids.sort_unstable();
        assert_eq!(element_ids, vec!["100", "101", "102"]);

        for result in sweep.switching_elements.iter().filter(|r| !r.is_root()) {
            assert_eq!(
                result.upstream_path.last(),
                result.parent_operational_code.as_ref()
            );
        }
    }

    #[test]
    fn test_missing_line_node_is_dead_end() {
        let mut dataset = create_radial_dataset();
        let mut stub = LineSegment::new("L9", "C1");
        stub.node1 = Some("N1".to_string());
        dataset.add_line(stub);

        let topology = NetworkTopology::new(&dataset);
        let sweep = sweep_circuit(&topology, "C1").unwrap();

        assert!(sweep.lines.iter().any(|l| l.line.id == "L9"));
        assert_eq!(sweep.switching_elements.len(), 3);
    }

    #[test]
    fn test_sweep_is_repeatable() {
        let dataset = create_radial_dataset();
        let topology = NetworkTopology::new(&dataset);

        let first = sweep_circuit(&topology, "C1").unwrap();
        let second = sweep_circuit(&topology, "C1").unwrap();

        assert_eq!(first.switching_elements, second.switching_elements);
        assert_eq!(first.lines, second.lines);
        assert_eq!(first.tie_candidates, second.tie_candidates);
    }
}
