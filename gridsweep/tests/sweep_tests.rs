//! Sweep behaviour on in-memory networks

use gridsweep::prelude::*;
use std::collections::HashSet;

/// Breaker C1 at N1; L1 (N1-N2); closed S1 (N2-N3); open S2 (N3-N4);
/// L2 (N4-N5); S3 of circuit C2 touching N5.
fn create_scenario() -> NetworkDataset {
    let mut dataset = NetworkDataset::new();
    dataset.add_circuit("C1");
    dataset.add_circuit("C2");
    dataset.add_switching_element(SwitchingElement::new("1", "C1", "C1").with_nodes("N0", "N1"));
    dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N1", "N2"));
    dataset.add_switching_element(SwitchingElement::new("2", "S1", "C1").with_nodes("N2", "N3"));
    dataset.add_switching_element(SwitchingElement::new("3", "S2", "C1").with_nodes("N3", "N4").open());
    dataset.add_line(LineSegment::new("L2", "C1").with_nodes("N4", "N5"));
    dataset.add_switching_element(SwitchingElement::new("10", "C2", "C2").with_nodes("M0", "M1"));
    dataset.add_line(LineSegment::new("L20", "C2").with_nodes("M1", "M2"));
    dataset.add_switching_element(SwitchingElement::new("11", "S3", "C2").with_nodes("M2", "N5"));
    dataset
}

/// A grid of closed switches and lines fed by one breaker, with loops.
fn create_mesh(size: usize) -> NetworkDataset {
    let mut dataset = NetworkDataset::new();
    dataset.add_circuit("M");
    dataset.add_switching_element(SwitchingElement::new("B", "M", "M").with_nodes("SRC", "0-0"));
    for row in 0..size {
        for col in 0..size {
            let here = format!("{}-{}", row, col);
            if col + 1 < size {
                let right = format!("{}-{}", row, col + 1);
                dataset.add_line(LineSegment::new(format!("L{}", here), "M").with_nodes(&here, right));
            }
            if row + 1 < size {
                let down = format!("{}-{}", row + 1, col);
                dataset.add_switching_element(
                    SwitchingElement::new(format!("S{}", here), format!("K{}", here), "M").with_nodes(&here, down),
                );
            }
        }
    }
    dataset
}

#[test]
fn test_scenario_hierarchy_and_closure() {
    let result = gridsweep::sweep(&create_scenario());

    let l1 = result.line("C1", "L1").unwrap();
    assert_eq!(l1.parent_operational_code.as_deref(), Some("C1"));
    assert_eq!(l1.upstream_path, vec!["C1"]);

    let s1 = result.switching_element("C1", "2").unwrap();
    assert_eq!(s1.parent_operational_code.as_deref(), Some("C1"));
    assert_eq!(s1.upstream_path, vec!["C1"]);

    let s2 = result.switching_element("C1", "3").unwrap();
    assert_eq!(s2.parent_operational_code.as_deref(), Some("S1"));
    assert_eq!(s2.upstream_path, vec!["C1", "S1"]);
    assert_eq!(s2.unexplored_ring_node.as_deref(), Some("N4"));

    let closure = s2.ring_closure.as_ref().unwrap();
    assert_eq!(closure.equipment_code, "S3");
    assert_eq!(closure.circuit, "C2");
    assert_eq!(closure.kind, RingKind::External);
}

#[test]
fn test_mesh_elements_appear_exactly_once() {
    let dataset = create_mesh(6);
    let result = gridsweep::sweep(&dataset);

    let switch_ids: Vec<&str> = result.switching_elements.iter().map(|r| r.element.id.as_str()).collect();
    let unique: HashSet<&str> = switch_ids.iter().copied().collect();
    assert_eq!(switch_ids.len(), unique.len());
    assert_eq!(switch_ids.len(), dataset.switching_elements.len());

    let line_ids: HashSet<&str> = result.lines.iter().map(|r| r.line.id.as_str()).collect();
    assert_eq!(line_ids.len(), result.lines.len());
    assert_eq!(line_ids.len(), dataset.lines.len());
}

#[test]
fn test_paths_end_with_parent() {
    let result = gridsweep::sweep(&create_mesh(5));

    for row in &result.switching_elements {
        match row.parent_operational_code.as_deref() {
            None => assert_eq!(row.upstream_path, vec!["M"]),
            Some(parent) => assert_eq!(row.upstream_path.last().map(String::as_str), Some(parent)),
        }
    }
    for row in &result.lines {
        let parent = row.parent_operational_code.as_deref();
        assert_eq!(row.upstream_path.last().map(String::as_str), parent);
    }
}

#[test]
fn test_rerun_is_identical() {
    let dataset = create_mesh(4);
    let first = gridsweep::sweep(&dataset);
    let second = gridsweep::sweep(&dataset);

    assert_eq!(first.switching_elements, second.switching_elements);
    assert_eq!(first.lines, second.lines);
    assert_eq!(first.summaries, second.summaries);
}

#[test]
fn test_ring_search_can_be_disabled() {
    let options = SweepOptions {
        ring_search: false,
        ..Default::default()
    };
    let result = GridSweepCore::run(&create_scenario(), &options);

    let s2 = result.switching_element("C1", "3").unwrap();
    assert_eq!(s2.unexplored_ring_node.as_deref(), Some("N4"));
    assert!(s2.ring_closure.is_none());
}

#[test]
fn test_dead_end_tie_is_not_an_error() {
    let mut dataset = NetworkDataset::new();
    dataset.add_circuit("C1");
    dataset.add_switching_element(SwitchingElement::new("1", "C1", "C1").with_nodes("N0", "N1"));
    dataset.add_switching_element(SwitchingElement::new("2", "S1", "C1").with_nodes("N1", "N2").open());
    dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N2", "N3"));

    let result = gridsweep::sweep(&dataset);
    let tie = result.switching_element("C1", "2").unwrap();
    assert!(tie.ring_closure.is_none());
    assert_eq!(result.summary("C1").unwrap().unresolved_ties, 1);
}

#[test]
fn test_tie_to_dark_section_of_neighbour() {
    for state in [SwitchState::Closed, SwitchState::Open] {
        let mut dataset = NetworkDataset::new();
        dataset.add_circuit("C1");
        dataset.add_circuit("C2");
        dataset.add_switching_element(SwitchingElement::new("1", "C1", "C1").with_nodes("N0", "N1"));
        dataset.add_line(LineSegment::new("L1", "C1").with_nodes("N1", "N2"));
        dataset.add_switching_element(SwitchingElement::new("2", "S2", "C1").with_nodes("N2", "N4").open());
        dataset.add_line(LineSegment::new("L2", "C1").with_nodes("N4", "N5"));
        dataset.add_switching_element(SwitchingElement::new("10", "C2", "C2").with_nodes("M0", "M1"));
        dataset.add_switching_element(SwitchingElement::new("11", "S4", "C2").with_nodes("M1", "M2").open());
        dataset.add_line(LineSegment::new("L21", "C2").with_nodes("M2", "M3"));
        dataset.add_switching_element(
            SwitchingElement::new("12", "S3", "C2")
                .with_nodes("M3", "N5")
                .with_state(state),
        );

        let result = gridsweep::sweep(&dataset);
        assert!(result.switching_element("C2", "12").is_none());

        let tie = result.switching_element("C1", "2").unwrap();
        let closure = tie.ring_closure.as_ref().unwrap();
        assert_eq!(closure.equipment_code, "S3");
        assert_eq!(closure.circuit, "C2");
        assert_eq!(closure.kind, RingKind::External);
        assert_eq!(result.summary("C1").unwrap().external_ties, 1);
    }
}
