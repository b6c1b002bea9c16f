//! Dataset loader for delimited network exports.
//!
//! A dataset directory holds one file per table. Headers are matched
//! case-insensitively against the English column names and the utility's
//! export headers, so both `node1` and `NODO1_ID` work.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::core::GridSweepError;
use crate::network::{Circuit, LineSegment, NetworkDataset, SwitchState, SwitchingElement, Transformer};

/// Where and how to read a dataset directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    pub delimiter: u8,
    pub circuits_file: String,
    pub switching_elements_file: String,
    pub lines_file: String,
    pub transformers_file: String,
    /// Fail when the transformers file is absent instead of loading none
    pub transformers_required: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            circuits_file: "circuits.csv".to_string(),
            switching_elements_file: "switching_elements.csv".to_string(),
            lines_file: "lines.csv".to_string(),
            transformers_file: "transformers.csv".to_string(),
            transformers_required: false,
        }
    }
}

/// A logical column and the headers accepted for it
struct Column {
    name: &'static str,
    aliases: &'static [&'static str],
    required: bool,
}

const fn required(name: &'static str, aliases: &'static [&'static str]) -> Column {
    Column { name, aliases, required: true }
}

const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Column {
    Column { name, aliases, required: false }
}

const CIRCUIT_COLUMNS: &[Column] = &[required("name", &["circuit", "circuito"])];

const SWITCHING_ELEMENT_COLUMNS: &[Column] = &[
    required("id", &["g3e_fid"]),
    required("node1", &["nodo1_id"]),
    required("node2", &["nodo2_id"]),
    required("operational_code", &["codigo_operativo"]),
    optional("element_type", &["tipo"]),
    required("stable_state", &["est_estable"]),
    required("native_circuit", &["circuito"]),
];

const LINE_COLUMNS: &[Column] = &[
    required("id", &["g3e_fid"]),
    required("node1", &["nodo1_id"]),
    required("node2", &["nodo2_id"]),
    required("native_circuit", &["circuito"]),
];

const TRANSFORMER_COLUMNS: &[Column] = &[
    required("id", &["g3e_fid"]),
    optional("code", &["codigo"]),
    required("node1", &["nodo1_id"]),
    required("node2", &["nodo2_id"]),
    required("native_circuit", &["circuito"]),
];

/// Positions of the logical columns inside one file's header
struct HeaderMap {
    positions: Vec<Option<usize>>,
}

impl HeaderMap {
    fn resolve(file: &Path, headers: &StringRecord, columns: &[Column]) -> Result<Self, GridSweepError> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|column| {
                normalized
                    .iter()
                    .position(|h| h == column.name || column.aliases.contains(&h.as_str()))
            })
            .collect();

        let missing: Vec<String> = columns
            .iter()
            .zip(&positions)
            .filter(|(column, position)| column.required && position.is_none())
            .map(|(column, _)| column.name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(GridSweepError::MissingColumns {
                file: file.to_path_buf(),
                columns: missing,
            });
        }
        Ok(Self { positions })
    }

    /// Why a record cannot be loaded: a required field is absent from a
    /// short row, or the identifying first column is blank.
    fn incomplete(&self, record: &StringRecord, columns: &[Column]) -> Option<String> {
        let absent: Vec<&str> = columns
            .iter()
            .zip(&self.positions)
            .filter(|(column, position)| column.required && position.map_or(true, |i| i >= record.len()))
            .map(|(column, _)| column.name)
            .collect();
        if !absent.is_empty() {
            return Some(format!("missing {}", absent.join(", ")));
        }
        if self.text(record, 0).is_empty() {
            return Some(format!("blank {}", columns[0].name));
        }
        None
    }

    fn get<'r>(&self, record: &'r StringRecord, column: usize) -> Option<&'r str> {
        self.positions[column].and_then(|i| record.get(i))
    }

    fn text(&self, record: &StringRecord, column: usize) -> String {
        self.get(record, column).unwrap_or_default().trim().to_string()
    }

    fn node(&self, record: &StringRecord, column: usize) -> Option<String> {
        self.get(record, column).and_then(normalize_node)
    }
}

/// Node references that mean "not connected" become `None`
fn normalize_node(value: &str) -> Option<String> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "" | "nan" | "none" | "null" => None,
        _ => Some(value.to_string()),
    }
}

fn csv_error(file: &Path, e: csv::Error) -> GridSweepError {
    GridSweepError::Csv {
        file: file.to_path_buf(),
        message: e.to_string(),
    }
}

/// Open `path`, resolve its header against `columns` and hand every record
/// to `row`.
fn read_table<F>(path: &Path, options: &LoaderOptions, columns: &[Column], mut row: F) -> Result<(), GridSweepError>
where
    F: FnMut(&HeaderMap, &StringRecord),
{
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let map = HeaderMap::resolve(path, &headers, columns)?;

    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if let Some(problem) = map.incomplete(&record, columns) {
            tracing::warn!(
                "{}: skipping record at line {}: {}",
                path.display(),
                record.position().map(|p| p.line()).unwrap_or_default(),
                problem
            );
            continue;
        }
        row(&map, &record);
    }
    Ok(())
}

/// Circuit names in file order. Repeated names are dropped.
pub fn load_circuits(path: &Path, options: &LoaderOptions) -> Result<Vec<Circuit>, GridSweepError> {
    let mut circuits = Vec::new();
    let mut seen = HashSet::new();
    read_table(path, options, CIRCUIT_COLUMNS, |map, record| {
        let name = map.text(record, 0);
        if seen.insert(name.clone()) {
            circuits.push(Circuit::new(name));
        } else {
            tracing::warn!("{}: duplicate circuit '{}' ignored", path.display(), name);
        }
    })?;
    Ok(circuits)
}

pub fn load_switching_elements(
    path: &Path,
    options: &LoaderOptions,
) -> Result<Vec<SwitchingElement>, GridSweepError> {
    let mut elements = Vec::new();
    read_table(path, options, SWITCHING_ELEMENT_COLUMNS, |map, record| {
        let id = map.text(record, 0);
        let raw_state = map.text(record, 5);
        let stable_state = raw_state.parse::<SwitchState>().unwrap_or_else(|_| {
            tracing::warn!(
                "{}: element {} has unknown state '{}', loading as OPEN",
                path.display(),
                id,
                raw_state
            );
            SwitchState::Open
        });
        let element_type = match map.text(record, 4).to_ascii_uppercase() {
            t if t.is_empty() => "SWITCH".to_string(),
            t => t,
        };

        elements.push(SwitchingElement {
            node1: map.node(record, 1),
            node2: map.node(record, 2),
            operational_code: map.text(record, 3),
            element_type,
            stable_state,
            native_circuit: map.text(record, 6),
            id,
        });
    })?;
    Ok(elements)
}

pub fn load_lines(path: &Path, options: &LoaderOptions) -> Result<Vec<LineSegment>, GridSweepError> {
    let mut lines = Vec::new();
    read_table(path, options, LINE_COLUMNS, |map, record| {
        lines.push(LineSegment {
            id: map.text(record, 0),
            node1: map.node(record, 1),
            node2: map.node(record, 2),
            native_circuit: map.text(record, 3),
        });
    })?;
    Ok(lines)
}

pub fn load_transformers(path: &Path, options: &LoaderOptions) -> Result<Vec<Transformer>, GridSweepError> {
    let mut transformers = Vec::new();
    read_table(path, options, TRANSFORMER_COLUMNS, |map, record| {
        let code = map.text(record, 1);
        transformers.push(Transformer {
            id: map.text(record, 0),
            code: (!code.is_empty()).then_some(code),
            node1: map.node(record, 2),
            node2: map.node(record, 3),
            native_circuit: map.text(record, 4),
        });
    })?;
    Ok(transformers)
}

/// Load the four tables of a dataset directory.
pub fn load_dataset(dir: &Path, options: &LoaderOptions) -> Result<NetworkDataset, GridSweepError> {
    if !dir.is_dir() {
        return Err(GridSweepError::Other(format!(
            "dataset directory not found: {}",
            dir.display()
        )));
    }

    let circuits = load_circuits(&dir.join(&options.circuits_file), options)?;
    let switching_elements = load_switching_elements(&dir.join(&options.switching_elements_file), options)?;
    let lines = load_lines(&dir.join(&options.lines_file), options)?;

    let transformers_path: PathBuf = dir.join(&options.transformers_file);
    let transformers = if transformers_path.is_file() || options.transformers_required {
        load_transformers(&transformers_path, options)?
    } else {
        tracing::info!(
            "{} not found, continuing without transformers",
            transformers_path.display()
        );
        Vec::new()
    };

    let dataset = NetworkDataset {
        circuits,
        switching_elements,
        lines,
        transformers,
    };
    let stats = dataset.stats();
    tracing::info!(
        "Loaded {}: {} circuits, {} switching elements, {} lines, {} transformers",
        dir.display(),
        stats.circuit_count,
        stats.switching_element_count,
        stats.line_count,
        stats.transformer_count
    );
    Ok(dataset)
}
