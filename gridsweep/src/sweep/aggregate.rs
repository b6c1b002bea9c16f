//! Result aggregation
//!
//! Merges the private per-circuit buffers into three flat tables and counts
//! what each circuit reached.

use std::collections::HashSet;

use crate::results::{
    CircuitSummary, LineResult, RingKind, SweepResult, SwitchingElementResult, TransformerResult,
};

use super::energization::CircuitSweep;

/// Rows keyed by (id, origin circuit, parent code, upstream path)
trait RowKey {
    fn row_key(&self) -> (&str, &str, Option<&str>, &[String]);
}

impl RowKey for SwitchingElementResult {
    fn row_key(&self) -> (&str, &str, Option<&str>, &[String]) {
        (
            self.element.id.as_str(),
            self.origin_circuit.as_str(),
            self.parent_operational_code.as_deref(),
            self.upstream_path.as_slice(),
        )
    }
}

impl RowKey for LineResult {
    fn row_key(&self) -> (&str, &str, Option<&str>, &[String]) {
        (
            self.line.id.as_str(),
            self.origin_circuit.as_str(),
            self.parent_operational_code.as_deref(),
            self.upstream_path.as_slice(),
        )
    }
}

impl RowKey for TransformerResult {
    fn row_key(&self) -> (&str, &str, Option<&str>, &[String]) {
        (
            self.transformer.id.as_str(),
            self.origin_circuit.as_str(),
            self.parent_operational_code.as_deref(),
            self.upstream_path.as_slice(),
        )
    }
}

/// Keep the first row for every composite key, preserving order
fn dedupe<T: RowKey>(rows: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<(String, String, Option<String>, Vec<String>)> = HashSet::new();
    let before = rows.len();
    let kept: Vec<T> = rows
        .into_iter()
        .filter(|row| {
            let (id, circuit, parent, path) = row.row_key();
            seen.insert((
                id.to_string(),
                circuit.to_string(),
                parent.map(str::to_string),
                path.to_vec(),
            ))
        })
        .collect();
    if kept.len() != before {
        tracing::warn!("Dropped {} duplicate result rows", before - kept.len());
    }
    kept
}

fn summarize(sweep: &CircuitSweep) -> CircuitSummary {
    let mut summary = CircuitSummary {
        circuit: sweep.circuit.clone(),
        breaker_found: true,
        switching_elements: sweep.switching_elements.len(),
        lines: sweep.lines.len(),
        transformers: sweep.transformers.len(),
        open_ties: sweep.tie_candidates.len(),
        ..Default::default()
    };
    for candidate in &sweep.tie_candidates {
        match sweep.switching_elements[candidate.row]
            .ring_closure
            .as_ref()
            .map(|c| c.kind)
        {
            Some(RingKind::Internal) => summary.internal_rings += 1,
            Some(RingKind::External) => summary.external_ties += 1,
            None => summary.unresolved_ties += 1,
        }
    }
    summary
}

/// Merge swept circuits into the final tables.
///
/// `circuits` gives the reporting order of the summaries; circuits without a
/// sweep (no breaker) get an empty summary with `breaker_found = false`.
pub fn aggregate(circuits: &[String], sweeps: Vec<CircuitSweep>, deduplicate: bool) -> SweepResult {
    let mut result = SweepResult::default();

    for circuit in circuits {
        match sweeps.iter().find(|s| &s.circuit == circuit) {
            Some(sweep) => result.summaries.push(summarize(sweep)),
            None => result.summaries.push(CircuitSummary {
                circuit: circuit.clone(),
                ..Default::default()
            }),
        }
    }

    for sweep in sweeps {
        result.switching_elements.extend(sweep.switching_elements);
        result.lines.extend(sweep.lines);
        result.transformers.extend(sweep.transformers);
    }

    if deduplicate {
        result.switching_elements = dedupe(result.switching_elements);
        result.lines = dedupe(result.lines);
        result.transformers = dedupe(result.transformers);
    }

    result
}
