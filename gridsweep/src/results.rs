//! Result records produced by the sweep.
//!
//! One explicit record type per entity kind, each embedding the input record
//! it describes plus the hierarchy fields the sweep assigns.

use serde::{Deserialize, Serialize};

use crate::network::{LineSegment, SwitchState, SwitchingElement, Transformer};

/// Ordered operational codes from a circuit's breaker to the nearest
/// enclosing switching element, inclusive.
pub type UpstreamPath = Vec<String>;

/// Join an upstream path the way the exported tables show it
pub fn format_path(path: &[String]) -> String {
    path.join(",")
}

/// Whether a ring closes back into the same circuit or ties two circuits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RingKind {
    Internal,
    External,
}

impl RingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RingKind::Internal => "INTERNAL",
            RingKind::External => "EXTERNAL",
        }
    }
}

/// Equipment a tie switch would connect to if it were closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingClosure {
    pub equipment_id: String,
    pub equipment_code: String,
    pub circuit: String,
    pub upstream_path: UpstreamPath,
    pub kind: RingKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingElementResult {
    #[serde(flatten)]
    pub element: SwitchingElement,
    pub parent_operational_code: Option<String>,
    pub upstream_path: UpstreamPath,
    pub origin_circuit: String,
    /// State the sweep actually used; the stored one stays on `element`
    pub effective_state: SwitchState,
    pub unexplored_ring_node: Option<String>,
    pub ring_closure: Option<RingClosure>,
}

impl SwitchingElementResult {
    pub fn is_root(&self) -> bool {
        self.parent_operational_code.is_none()
    }

    pub fn is_tie_candidate(&self) -> bool {
        self.unexplored_ring_node.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResult {
    #[serde(flatten)]
    pub line: LineSegment,
    pub parent_operational_code: Option<String>,
    pub upstream_path: UpstreamPath,
    pub origin_circuit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerResult {
    #[serde(flatten)]
    pub transformer: Transformer,
    pub parent_operational_code: Option<String>,
    pub upstream_path: UpstreamPath,
    pub origin_circuit: String,
    /// Energized line through which the transformer was discovered
    pub feeding_line_id: String,
}

/// Per-circuit counts of what a run reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub circuit: String,
    pub breaker_found: bool,
    pub switching_elements: usize,
    pub lines: usize,
    pub transformers: usize,
    pub open_ties: usize,
    pub internal_rings: usize,
    pub external_ties: usize,
    pub unresolved_ties: usize,
}

impl CircuitSummary {
    pub fn closures_found(&self) -> usize {
        self.internal_rings + self.external_ties
    }
}

/// The three output tables plus per-circuit summaries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    pub switching_elements: Vec<SwitchingElementResult>,
    pub lines: Vec<LineResult>,
    pub transformers: Vec<TransformerResult>,
    pub summaries: Vec<CircuitSummary>,
}

impl SweepResult {
    pub fn switching_elements_for<'a>(
        &'a self,
        circuit: &'a str,
    ) -> impl Iterator<Item = &'a SwitchingElementResult> + 'a {
        self.switching_elements
            .iter()
            .filter(move |r| r.origin_circuit == circuit)
    }

    pub fn lines_for<'a>(&'a self, circuit: &'a str) -> impl Iterator<Item = &'a LineResult> + 'a {
        self.lines.iter().filter(move |r| r.origin_circuit == circuit)
    }

    pub fn transformers_for<'a>(
        &'a self,
        circuit: &'a str,
    ) -> impl Iterator<Item = &'a TransformerResult> + 'a {
        self.transformers
            .iter()
            .filter(move |r| r.origin_circuit == circuit)
    }

    /// Row for switching element `id` produced by `circuit`'s sweep
    pub fn switching_element(&self, circuit: &str, id: &str) -> Option<&SwitchingElementResult> {
        self.switching_elements
            .iter()
            .find(|r| r.origin_circuit == circuit && r.element.id == id)
    }

    pub fn line(&self, circuit: &str, id: &str) -> Option<&LineResult> {
        self.lines
            .iter()
            .find(|r| r.origin_circuit == circuit && r.line.id == id)
    }

    pub fn transformer(&self, circuit: &str, id: &str) -> Option<&TransformerResult> {
        self.transformers
            .iter()
            .find(|r| r.origin_circuit == circuit && r.transformer.id == id)
    }

    pub fn summary(&self, circuit: &str) -> Option<&CircuitSummary> {
        self.summaries.iter().find(|s| s.circuit == circuit)
    }

    pub fn unresolved_ties(&self) -> usize {
        self.summaries.iter().map(|s| s.unresolved_ties).sum()
    }
}
