//! Network Data Model
//!
//! Typed records for the four input tables of a distribution network:
//! circuits, switching elements, line segments and transformers. Nodes are
//! opaque string identifiers shared between records; they are not stored as
//! records of their own.
//!
//! The dataset is read-only once loaded. Anything the sweep needs to
//! "pretend" (such as forcing a foreign switch open) is computed from these
//! records, never written back.

pub mod topology;

pub use topology::{EquipmentKind, EquipmentRef, NetworkTopology, TopologyNode};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable (normal) state of a switching element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchState {
    Closed,
    Open,
}

impl SwitchState {
    pub fn is_closed(&self) -> bool {
        matches!(self, SwitchState::Closed)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SwitchState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchState::Closed => "CLOSED",
            SwitchState::Open => "OPEN",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLOSED" => Ok(SwitchState::Closed),
            "OPEN" => Ok(SwitchState::Open),
            other => Err(format!("unknown switch state '{}'", other)),
        }
    }
}

/// A circuit, identified by the operational code of its breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub name: String,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A disconnectable device (breaker, switch, recloser, protector, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingElement {
    pub id: String,
    pub node1: Option<String>,
    pub node2: Option<String>,
    /// Groups one or more physical devices under one switch identity
    pub operational_code: String,
    pub element_type: String,
    pub stable_state: SwitchState,
    pub native_circuit: String,
}

impl SwitchingElement {
    pub fn new(
        id: impl Into<String>,
        operational_code: impl Into<String>,
        native_circuit: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node1: None,
            node2: None,
            operational_code: operational_code.into(),
            element_type: "SWITCH".to_string(),
            stable_state: SwitchState::Closed,
            native_circuit: native_circuit.into(),
        }
    }

    pub fn with_nodes(mut self, node1: impl Into<String>, node2: impl Into<String>) -> Self {
        self.node1 = Some(node1.into());
        self.node2 = Some(node2.into());
        self
    }

    pub fn with_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = element_type.into();
        self
    }

    pub fn with_state(mut self, state: SwitchState) -> Self {
        self.stable_state = state;
        self
    }

    pub fn open(self) -> Self {
        self.with_state(SwitchState::Open)
    }

    /// State used while sweeping `circuit`.
    ///
    /// An element that belongs to another circuit is always treated as open,
    /// whatever its stored state, so a sweep never crosses into foreign
    /// territory.
    pub fn effective_state(&self, circuit: &str) -> SwitchState {
        if self.native_circuit != circuit {
            SwitchState::Open
        } else {
            self.stable_state
        }
    }

    pub fn far_node(&self, from: &str) -> Option<&str> {
        far_node(self.node1.as_deref(), self.node2.as_deref(), from)
    }
}

/// A passive line segment between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub id: String,
    pub node1: Option<String>,
    pub node2: Option<String>,
    pub native_circuit: String,
}

impl LineSegment {
    pub fn new(id: impl Into<String>, native_circuit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node1: None,
            node2: None,
            native_circuit: native_circuit.into(),
        }
    }

    pub fn with_nodes(mut self, node1: impl Into<String>, node2: impl Into<String>) -> Self {
        self.node1 = Some(node1.into());
        self.node2 = Some(node2.into());
        self
    }

    pub fn far_node(&self, from: &str) -> Option<&str> {
        far_node(self.node1.as_deref(), self.node2.as_deref(), from)
    }

    /// Both terminal nodes that are present
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.node1.as_deref().into_iter().chain(self.node2.as_deref())
    }
}

/// A distribution transformer. Always a leaf of the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformer {
    pub id: String,
    pub code: Option<String>,
    pub node1: Option<String>,
    pub node2: Option<String>,
    pub native_circuit: String,
}

impl Transformer {
    pub fn new(id: impl Into<String>, native_circuit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: None,
            node1: None,
            node2: None,
            native_circuit: native_circuit.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_nodes(mut self, node1: impl Into<String>, node2: impl Into<String>) -> Self {
        self.node1 = Some(node1.into());
        self.node2 = Some(node2.into());
        self
    }
}

/// The other terminal of a two-terminal element, seen from `from`.
///
/// Returns `None` when `from` is not a terminal of the element or when the
/// opposite terminal is missing or empty.
fn far_node<'a>(node1: Option<&'a str>, node2: Option<&'a str>, from: &str) -> Option<&'a str> {
    let far = if node1 == Some(from) {
        node2
    } else if node2 == Some(from) {
        node1
    } else {
        None
    };
    far.filter(|n| !n.is_empty())
}

/// The four input tables of a network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDataset {
    pub circuits: Vec<Circuit>,
    pub switching_elements: Vec<SwitchingElement>,
    pub lines: Vec<LineSegment>,
    pub transformers: Vec<Transformer>,
}

impl NetworkDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_circuit(&mut self, name: impl Into<String>) {
        self.circuits.push(Circuit::new(name));
    }

    pub fn add_switching_element(&mut self, element: SwitchingElement) {
        self.switching_elements.push(element);
    }

    pub fn add_line(&mut self, line: LineSegment) {
        self.lines.push(line);
    }

    pub fn add_transformer(&mut self, transformer: Transformer) {
        self.transformers.push(transformer);
    }

    /// The breaker feeding `circuit`: the first switching element whose
    /// operational code equals the circuit name.
    pub fn breaker_for(&self, circuit: &str) -> Option<(usize, &SwitchingElement)> {
        self.switching_elements
            .iter()
            .enumerate()
            .find(|(_, e)| e.operational_code == circuit)
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            circuit_count: self.circuits.len(),
            switching_element_count: self.switching_elements.len(),
            line_count: self.lines.len(),
            transformer_count: self.transformers.len(),
        }
    }
}

/// Record counts of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub circuit_count: usize,
    pub switching_element_count: usize,
    pub line_count: usize,
    pub transformer_count: usize,
}
