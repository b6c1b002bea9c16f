//! Network Topology Graph
//!
//! A bipartite petgraph over the dataset: every piece of equipment and every
//! node ("bus") is a graph node, and each edge is one terminal connection
//! between an equipment and a bus. Traversals only ever ask "what equipment of
//! kind K touches bus B", which this graph answers without scanning the
//! tables.

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{LineSegment, NetworkDataset, SwitchingElement, Transformer};

/// Kind of a two-terminal equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentKind {
    SwitchingElement,
    Line,
    Transformer,
}

/// Reference to a record in one of the dataset tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentRef {
    pub kind: EquipmentKind,
    pub index: usize,
}

impl EquipmentRef {
    pub fn switching_element(index: usize) -> Self {
        Self { kind: EquipmentKind::SwitchingElement, index }
    }

    pub fn line(index: usize) -> Self {
        Self { kind: EquipmentKind::Line, index }
    }

    pub fn transformer(index: usize) -> Self {
        Self { kind: EquipmentKind::Transformer, index }
    }
}

/// Node type in the topology graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyNode {
    Equipment(EquipmentRef),
    Bus(String),
}

impl TopologyNode {
    pub fn as_equipment(&self) -> Option<EquipmentRef> {
        match self {
            TopologyNode::Equipment(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_bus(&self) -> Option<&str> {
        match self {
            TopologyNode::Bus(name) => Some(name),
            _ => None,
        }
    }
}

/// Which side of the equipment an edge attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Node1,
    Node2,
}

/// Read-only connectivity index over a [`NetworkDataset`]
#[derive(Debug, Clone)]
pub struct NetworkTopology<'a> {
    dataset: &'a NetworkDataset,
    graph: UnGraph<TopologyNode, Terminal>,
    bus_indices: HashMap<String, NodeIndex>,
}

impl<'a> NetworkTopology<'a> {
    /// Index every record of the dataset. Missing or empty node references
    /// simply produce no edge, which makes them dead ends.
    pub fn new(dataset: &'a NetworkDataset) -> Self {
        let mut topology = Self {
            dataset,
            graph: UnGraph::default(),
            bus_indices: HashMap::new(),
        };

        for (index, element) in dataset.switching_elements.iter().enumerate() {
            topology.attach(
                EquipmentRef::switching_element(index),
                element.node1.as_deref(),
                element.node2.as_deref(),
            );
        }
        for (index, line) in dataset.lines.iter().enumerate() {
            topology.attach(EquipmentRef::line(index), line.node1.as_deref(), line.node2.as_deref());
        }
        for (index, transformer) in dataset.transformers.iter().enumerate() {
            topology.attach(
                EquipmentRef::transformer(index),
                transformer.node1.as_deref(),
                transformer.node2.as_deref(),
            );
        }

        tracing::debug!(
            "Topology indexed: {} buses, {} terminal connections",
            topology.bus_indices.len(),
            topology.graph.edge_count()
        );

        topology
    }

    fn add_bus(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.bus_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(TopologyNode::Bus(name.to_string()));
        self.bus_indices.insert(name.to_string(), idx);
        idx
    }

    fn attach(&mut self, equipment: EquipmentRef, node1: Option<&str>, node2: Option<&str>) {
        let equipment_idx = self.graph.add_node(TopologyNode::Equipment(equipment));
        for (terminal, node) in [(Terminal::Node1, node1), (Terminal::Node2, node2)] {
            if let Some(name) = node.filter(|n| !n.is_empty()) {
                let bus_idx = self.add_bus(name);
                self.graph.add_edge(equipment_idx, bus_idx, terminal);
            }
        }
    }

    pub fn dataset(&self) -> &'a NetworkDataset {
        self.dataset
    }

    pub fn has_bus(&self, bus: &str) -> bool {
        self.bus_indices.contains_key(bus)
    }

    /// Indices of all equipment of `kind` touching `bus`, in table order
    pub fn equipment_at(&self, bus: &str, kind: EquipmentKind) -> Vec<usize> {
        let Some(&bus_idx) = self.bus_indices.get(bus) else {
            return Vec::new();
        };

        let mut indices: Vec<usize> = self
            .graph
            .neighbors(bus_idx)
            .filter_map(|n| self.graph.node_weight(n).and_then(|w| w.as_equipment()))
            .filter(|e| e.kind == kind)
            .map(|e| e.index)
            .collect();
        // An element with both terminals on the same bus shows up twice
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn lines_at(&self, bus: &str) -> Vec<usize> {
        self.equipment_at(bus, EquipmentKind::Line)
    }

    pub fn switching_elements_at(&self, bus: &str) -> Vec<usize> {
        self.equipment_at(bus, EquipmentKind::SwitchingElement)
    }

    pub fn transformers_at(&self, bus: &str) -> Vec<usize> {
        self.equipment_at(bus, EquipmentKind::Transformer)
    }

    pub fn switching_element(&self, index: usize) -> &'a SwitchingElement {
        &self.dataset.switching_elements[index]
    }

    pub fn line(&self, index: usize) -> &'a LineSegment {
        &self.dataset.lines[index]
    }

    pub fn transformer(&self, index: usize) -> &'a Transformer {
        &self.dataset.transformers[index]
    }

    pub fn stats(&self) -> TopologyStats {
        TopologyStats {
            bus_count: self.bus_indices.len(),
            equipment_count: self.graph.node_count() - self.bus_indices.len(),
            connection_count: self.graph.edge_count(),
        }
    }
}

/// Statistics about a topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub bus_count: usize,
    pub equipment_count: usize,
    pub connection_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LineSegment, SwitchingElement, Transformer};

    fn create_test_dataset() -> NetworkDataset {
        let mut dataset = NetworkDataset::new();
        dataset.add_circuit("C1");
        dataset.add_switching_element(SwitchingElement::new("1", "C1", "C1").with_nodes("N0", "N1"));
        dataset.add_switching_element(SwitchingElement::new("2", "S1", "C1").with_nodes("N2", "N3"));
        dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N1", "N2"));
        dataset.add_line(LineSegment::new("L2", "C1").with_nodes("N2", "N2"));
        dataset.add_transformer(Transformer::new("T1", "C1").with_nodes("N2", ""));
        dataset
    }

    #[test]
    fn test_equipment_lookup_by_bus() {
        let dataset = create_test_dataset();
        let topology = NetworkTopology::new(&dataset);

        assert_eq!(topology.lines_at("N2"), vec![0, 1]);
        assert_eq!(topology.switching_elements_at("N2"), vec![1]);
        assert_eq!(topology.transformers_at("N2"), vec![0]);
        assert!(topology.lines_at("N9").is_empty());
    }

    #[test]
    fn test_empty_nodes_are_not_indexed() {
        let dataset = create_test_dataset();
        let topology = NetworkTopology::new(&dataset);

        assert!(!topology.has_bus(""));
        assert!(topology.transformers_at("").is_empty());
    }

    #[test]
    fn test_topology_stats() {
        let dataset = create_test_dataset();
        let stats = NetworkTopology::new(&dataset).stats();

        assert_eq!(stats.bus_count, 4);
        assert_eq!(stats.equipment_count, 5);
        // 2 + 2 switch terminals, 2 + 2 line terminals, 1 transformer terminal
        assert_eq!(stats.connection_count, 9);
    }
}
