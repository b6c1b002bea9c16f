//! Core sweep orchestration shared by the CLI and embedding applications.
//! No I/O besides the optional directory loader.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::loader::{load_dataset, LoaderOptions};
use crate::network::{NetworkDataset, NetworkTopology};
use crate::results::SweepResult;
use crate::sweep::{aggregate, annotate_ring_closures, sweep_circuit, SweepError, DEFAULT_MAX_RING_STEPS};

#[derive(Debug, thiserror::Error)]
pub enum GridSweepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error in {file}: {message}")]
    Csv { file: PathBuf, message: String },
    #[error("{file}: missing required columns: {}", columns.join(", "))]
    MissingColumns { file: PathBuf, columns: Vec<String> },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for GridSweepError {
    fn from(e: serde_json::Error) -> Self {
        GridSweepError::Other(e.to_string())
    }
}

/// Options for a sweep run (CLI or embedding).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    /// Upper bound on nodes expanded by one ring search
    pub max_ring_steps: usize,
    pub deduplicate: bool,
    /// Run the ring-closure pass after the energization sweep
    pub ring_search: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            max_ring_steps: DEFAULT_MAX_RING_STEPS,
            deduplicate: true,
            ring_search: true,
        }
    }
}

impl SweepOptions {
    /// Read options from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, GridSweepError> {
        let content = std::fs::read_to_string(path)?;
        let options: SweepOptions = serde_json::from_str(&content)
            .map_err(|e| GridSweepError::Config(format!("{}: {}", path.display(), e)))?;
        if options.max_ring_steps == 0 {
            return Err(GridSweepError::Config(
                "max_ring_steps must be greater than zero".to_string(),
            ));
        }
        Ok(options)
    }
}

/// Core sweep API used by the CLI.
pub struct GridSweepCore;

impl GridSweepCore {
    /// Sweep every circuit of `dataset`, then search ring closures behind
    /// the open ties, then merge everything into flat tables.
    pub fn run(dataset: &NetworkDataset, options: &SweepOptions) -> SweepResult {
        let topology = NetworkTopology::new(dataset);
        let circuits: Vec<String> = dataset.circuits.iter().map(|c| c.name.clone()).collect();

        let mut sweeps = Vec::with_capacity(circuits.len());
        for circuit in &circuits {
            match sweep_circuit(&topology, circuit) {
                Ok(sweep) => sweeps.push(sweep),
                Err(SweepError::MissingBreaker { circuit }) => {
                    tracing::warn!("Circuit {}: breaker not found, skipping", circuit);
                }
            }
        }

        if options.ring_search {
            let stats = annotate_ring_closures(&topology, &mut sweeps, options.max_ring_steps);
            tracing::info!(
                "Ring search: {} ties searched, {} closures found, {} dead ends, {} step-limited",
                stats.searched,
                stats.found,
                stats.dead_ends,
                stats.step_limited
            );
        }

        let result = aggregate(&circuits, sweeps, options.deduplicate);
        tracing::info!(
            "Sweep finished: {} circuits, {} switching elements, {} lines, {} transformers",
            result.summaries.len(),
            result.switching_elements.len(),
            result.lines.len(),
            result.transformers.len()
        );
        result
    }

    /// Load a dataset directory and run the sweep on it.
    pub fn sweep_directory(
        dir: &Path,
        loader: &LoaderOptions,
        options: &SweepOptions,
    ) -> Result<(NetworkDataset, SweepResult), GridSweepError> {
        let dataset = load_dataset(dir, loader)?;
        let result = Self::run(&dataset, options);
        Ok((dataset, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LineSegment, SwitchingElement};
    use crate::results::RingKind;

    fn create_dataset() -> NetworkDataset {
        let mut dataset = NetworkDataset::new();
        dataset.add_circuit("C1");
        dataset.add_circuit("C2");
        dataset.add_circuit("C9");
        dataset.add_switching_element(SwitchingElement::new("100", "C1", "C1").with_nodes("N0", "N1"));
        dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N1", "N2"));
        dataset.add_switching_element(SwitchingElement::new("101", "S2", "C1").with_nodes("N2", "N3").open());
        dataset.add_line(LineSegment::new("L2", "C1").with_nodes("N3", "N4"));
        dataset.add_switching_element(SwitchingElement::new("200", "C2", "C2").with_nodes("M0", "N4"));
        dataset
    }

    #[test]
    fn test_default_options() {
        let options = SweepOptions::default();
        assert_eq!(options.max_ring_steps, 200);
        assert!(options.deduplicate);
        assert!(options.ring_search);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: SweepOptions = serde_json::from_str(r#"{"max_ring_steps": 50}"#).unwrap();
        assert_eq!(options.max_ring_steps, 50);
        assert!(options.ring_search);
    }

    #[test]
    fn test_options_file_rejects_zero_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"max_ring_steps": 0}"#).unwrap();
        assert!(matches!(
            SweepOptions::from_json_file(&path),
            Err(GridSweepError::Config(_))
        ));
    }

    #[test]
    fn test_run_resolves_ties_and_skips_missing_breakers() {
        let dataset = create_dataset();
        let result = GridSweepCore::run(&dataset, &SweepOptions::default());

        let tie = result.switching_element("C1", "101").unwrap();
        assert_eq!(tie.unexplored_ring_node.as_deref(), Some("N3"));
        let closure = tie.ring_closure.as_ref().unwrap();
        assert_eq!(closure.equipment_code, "C2");
        assert_eq!(closure.kind, RingKind::External);

        let c9 = result.summary("C9").unwrap();
        assert!(!c9.breaker_found);
        assert_eq!(result.summaries.len(), 3);
    }

    #[test]
    fn test_run_without_ring_search() {
        let dataset = create_dataset();
        let options = SweepOptions {
            ring_search: false,
            ..Default::default()
        };
        let result = GridSweepCore::run(&dataset, &options);
        let tie = result.switching_element("C1", "101").unwrap();
        assert!(tie.is_tie_candidate());
        assert!(tie.ring_closure.is_none());
        assert_eq!(result.summary("C1").unwrap().unresolved_ties, 1);
    }
}
