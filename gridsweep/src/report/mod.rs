//! Reports built from a [`SweepResult`]: flat CSV tables, a JSON document,
//! a console summary table and per-circuit protection hierarchies in DOT.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::core::GridSweepError;
use crate::results::{
    format_path, CircuitSummary, LineResult, SweepResult, SwitchingElementResult, TransformerResult,
};

/// One exported row of the switching-element table
#[derive(Debug, Serialize)]
pub struct SwitchingElementRecord<'a> {
    pub id: &'a str,
    pub node1: Option<&'a str>,
    pub node2: Option<&'a str>,
    pub operational_code: &'a str,
    pub element_type: &'a str,
    pub stable_state: &'static str,
    pub native_circuit: &'a str,
    pub effective_state: &'static str,
    pub parent_operational_code: Option<&'a str>,
    pub upstream_path: String,
    pub origin_circuit: &'a str,
    pub unexplored_ring_node: Option<&'a str>,
    pub ring_closure_id: Option<&'a str>,
    pub ring_closure_code: Option<&'a str>,
    pub ring_closure_circuit: Option<&'a str>,
    pub ring_closure_path: Option<String>,
    pub ring_kind: Option<&'static str>,
}

impl<'a> From<&'a SwitchingElementResult> for SwitchingElementRecord<'a> {
    fn from(row: &'a SwitchingElementResult) -> Self {
        let closure = row.ring_closure.as_ref();
        Self {
            id: &row.element.id,
            node1: row.element.node1.as_deref(),
            node2: row.element.node2.as_deref(),
            operational_code: &row.element.operational_code,
            element_type: &row.element.element_type,
            stable_state: row.element.stable_state.as_str(),
            native_circuit: &row.element.native_circuit,
            effective_state: row.effective_state.as_str(),
            parent_operational_code: row.parent_operational_code.as_deref(),
            upstream_path: format_path(&row.upstream_path),
            origin_circuit: &row.origin_circuit,
            unexplored_ring_node: row.unexplored_ring_node.as_deref(),
            ring_closure_id: closure.map(|c| c.equipment_id.as_str()),
            ring_closure_code: closure.map(|c| c.equipment_code.as_str()),
            ring_closure_circuit: closure.map(|c| c.circuit.as_str()),
            ring_closure_path: closure.map(|c| format_path(&c.upstream_path)),
            ring_kind: closure.map(|c| c.kind.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineRecord<'a> {
    pub id: &'a str,
    pub node1: Option<&'a str>,
    pub node2: Option<&'a str>,
    pub native_circuit: &'a str,
    pub parent_operational_code: Option<&'a str>,
    pub upstream_path: String,
    pub origin_circuit: &'a str,
}

impl<'a> From<&'a LineResult> for LineRecord<'a> {
    fn from(row: &'a LineResult) -> Self {
        Self {
            id: &row.line.id,
            node1: row.line.node1.as_deref(),
            node2: row.line.node2.as_deref(),
            native_circuit: &row.line.native_circuit,
            parent_operational_code: row.parent_operational_code.as_deref(),
            upstream_path: format_path(&row.upstream_path),
            origin_circuit: &row.origin_circuit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransformerRecord<'a> {
    pub id: &'a str,
    pub code: Option<&'a str>,
    pub node1: Option<&'a str>,
    pub node2: Option<&'a str>,
    pub native_circuit: &'a str,
    pub parent_operational_code: Option<&'a str>,
    pub upstream_path: String,
    pub origin_circuit: &'a str,
    pub feeding_line_id: &'a str,
}

impl<'a> From<&'a TransformerResult> for TransformerRecord<'a> {
    fn from(row: &'a TransformerResult) -> Self {
        Self {
            id: &row.transformer.id,
            code: row.transformer.code.as_deref(),
            node1: row.transformer.node1.as_deref(),
            node2: row.transformer.node2.as_deref(),
            native_circuit: &row.transformer.native_circuit,
            parent_operational_code: row.parent_operational_code.as_deref(),
            upstream_path: format_path(&row.upstream_path),
            origin_circuit: &row.origin_circuit,
            feeding_line_id: &row.feeding_line_id,
        }
    }
}

fn write_records<W, T, I>(writer: W, delimiter: u8, records: I) -> Result<(), csv::Error>
where
    W: io::Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the switching-element table to any writer (used for stdout output)
pub fn write_switching_elements<W: io::Write>(
    result: &SweepResult,
    writer: W,
    delimiter: u8,
) -> Result<(), GridSweepError> {
    write_records(
        writer,
        delimiter,
        result.switching_elements.iter().map(SwitchingElementRecord::from),
    )
    .map_err(|e| GridSweepError::Csv {
        file: PathBuf::from("<stdout>"),
        message: e.to_string(),
    })
}

/// Write `switching_elements.csv`, `lines.csv`, `transformers.csv` and
/// `summary.csv` into `dir`, creating it if needed. Returns the written paths.
pub fn write_csv_tables(
    result: &SweepResult,
    dir: &Path,
    delimiter: u8,
) -> Result<Vec<PathBuf>, GridSweepError> {
    std::fs::create_dir_all(dir)?;

    Ok(vec![
        export_table(dir, "switching_elements.csv", |f| {
            write_records(f, delimiter, result.switching_elements.iter().map(SwitchingElementRecord::from))
        })?,
        export_table(dir, "lines.csv", |f| {
            write_records(f, delimiter, result.lines.iter().map(LineRecord::from))
        })?,
        export_table(dir, "transformers.csv", |f| {
            write_records(f, delimiter, result.transformers.iter().map(TransformerRecord::from))
        })?,
        export_table(dir, "summary.csv", |f| write_records(f, delimiter, &result.summaries))?,
    ])
}

fn export_table<F>(dir: &Path, name: &str, write: F) -> Result<PathBuf, GridSweepError>
where
    F: FnOnce(std::fs::File) -> Result<(), csv::Error>,
{
    let path = dir.join(name);
    let file = std::fs::File::create(&path)?;
    write(file).map_err(|e| GridSweepError::Csv {
        file: path.clone(),
        message: e.to_string(),
    })?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Circuit")]
    circuit: String,
    #[tabled(rename = "Breaker")]
    breaker: &'static str,
    #[tabled(rename = "Switches")]
    switching_elements: usize,
    #[tabled(rename = "Lines")]
    lines: usize,
    #[tabled(rename = "Transformers")]
    transformers: usize,
    #[tabled(rename = "Open ties")]
    open_ties: usize,
    #[tabled(rename = "Internal")]
    internal_rings: usize,
    #[tabled(rename = "External")]
    external_ties: usize,
    #[tabled(rename = "Unresolved")]
    unresolved_ties: usize,
}

impl From<&CircuitSummary> for SummaryRow {
    fn from(s: &CircuitSummary) -> Self {
        Self {
            circuit: s.circuit.clone(),
            breaker: if s.breaker_found { "yes" } else { "missing" },
            switching_elements: s.switching_elements,
            lines: s.lines,
            transformers: s.transformers,
            open_ties: s.open_ties,
            internal_rings: s.internal_rings,
            external_ties: s.external_ties,
            unresolved_ties: s.unresolved_ties,
        }
    }
}

/// Per-circuit counts as a console table
pub fn summary_table(result: &SweepResult) -> String {
    let rows: Vec<SummaryRow> = result.summaries.iter().map(SummaryRow::from).collect();
    Table::new(rows).with(Style::markdown()).to_string()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    result: &'a SweepResult,
}

/// The full result as pretty-printed JSON, stamped with the current time
pub fn to_json(result: &SweepResult) -> Result<String, GridSweepError> {
    let report = JsonReport {
        generated_at: Utc::now(),
        result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Protection hierarchy of one circuit: one node per operational code,
/// edges from parent to child.
pub fn hierarchy_graph(result: &SweepResult, circuit: &str) -> DiGraph<String, String> {
    let mut graph = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    for row in result.switching_elements_for(circuit) {
        let code = row.element.operational_code.as_str();
        let label = if row.is_root() {
            format!("{} (breaker)", code)
        } else if row.is_tie_candidate() {
            format!("{} (open)", code)
        } else {
            code.to_string()
        };
        let index = *indices.entry(code).or_insert_with(|| graph.add_node(label));

        if let Some(parent) = row.parent_operational_code.as_deref() {
            if let Some(&parent_index) = indices.get(parent) {
                if parent_index != index {
                    graph.update_edge(parent_index, index, String::new());
                }
            }
        }
    }
    graph
}

/// [`hierarchy_graph`] rendered as Graphviz DOT text
pub fn hierarchy_dot(result: &SweepResult, circuit: &str) -> String {
    let graph = hierarchy_graph(result, circuit);
    format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}

/// Write `<circuit>.dot` for every swept circuit into `dir`. Characters
/// unsafe in file names become `_`; names that would clash get a numeric
/// suffix.
pub fn write_hierarchy_graphs(result: &SweepResult, dir: &Path) -> Result<Vec<PathBuf>, GridSweepError> {
    std::fs::create_dir_all(dir)?;
    let mut used: HashSet<String> = HashSet::new();
    let mut written = Vec::new();
    for summary in result.summaries.iter().filter(|s| s.breaker_found) {
        let base: String = summary
            .circuit
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let mut file_name = base.clone();
        let mut suffix = 1;
        // compared case-insensitively for case-folding filesystems
        while !used.insert(file_name.to_ascii_lowercase()) {
            suffix += 1;
            file_name = format!("{}_{}", base, suffix);
        }
        if file_name != base {
            tracing::warn!(
                "Hierarchy of circuit '{}' written as {}.dot to avoid a name clash",
                summary.circuit,
                file_name
            );
        }
        let path = dir.join(format!("{}.dot", file_name));
        std::fs::write(&path, hierarchy_dot(result, &summary.circuit))?;
        written.push(path);
    }
    Ok(written)
}
