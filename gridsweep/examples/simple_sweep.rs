//! Simple sweep example: load a dataset directory and print the hierarchy.
//! Run with: cargo run --example simple_sweep [path/to/dataset_dir]

use gridsweep::prelude::*;
use gridsweep::report;
use std::path::Path;

fn main() -> Result<(), GridSweepError> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/ring_network".to_string());

    let (_dataset, result) = GridSweepCore::sweep_directory(
        Path::new(&dir),
        &LoaderOptions::default(),
        &SweepOptions::default(),
    )?;

    for row in &result.switching_elements {
        let closure = match &row.ring_closure {
            Some(c) => format!(" -> {} {} ({})", c.kind.as_str(), c.equipment_code, c.circuit),
            None if row.is_tie_candidate() => " -> no closure".to_string(),
            None => String::new(),
        };
        println!(
            "[{}] {} parent={} path={}{}",
            row.origin_circuit,
            row.element.operational_code,
            row.parent_operational_code.as_deref().unwrap_or("-"),
            row.upstream_path.join(","),
            closure
        );
    }

    println!("\n{}", report::summary_table(&result));
    Ok(())
}
