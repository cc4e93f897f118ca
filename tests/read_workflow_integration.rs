//! Integration tests for the read workflow
//!
//! These tests validate the path from sources to the workspace:
//! - Listing and traversing source trees
//! - Batch reads with per-item failures
//! - Cooperative cancellation
//! - Naming of read results in the workspace

mod common;

use common::builders::{ShotBuilder, TraceBuilder};
use common::keep_going;
use common::mock_helpers::FlakyReader;
use std::ops::ControlFlow;
use std::sync::atomic::Ordering;
use xpad_rs::source::ReadError;
use xpad_rs::{
    read_selection, ReadConfig, Selection, SourceNode, SourceRegistry, VariableDescriptor,
    Workspace,
};

fn default_reads() -> ReadConfig {
    ReadConfig::default()
}

fn flaky_source(broken: &[&str]) -> (SourceNode, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
    let (reader, reads) = FlakyReader::new(broken);
    let node = SourceNode::with_reader("rig", Box::new(reader)).with_variables(
        ["ip", "ne", "te"]
            .into_iter()
            .map(|n| VariableDescriptor::new(n).with_units("au")),
    );
    (node, reads)
}

#[test]
fn test_list_all_variables_of_tree() {
    let shot = ShotBuilder::new("shot 29800")
        .variable("ip", TraceBuilder::new("ip").build())
        .variable("ne", TraceBuilder::new("ne").build())
        .child(
            ShotBuilder::new("magnetics")
                .variable("bpol", TraceBuilder::new("bpol").build())
                .build(),
        )
        .build();
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(shot);

    let names: Vec<_> = registry.list_variables(id, Some("*")).unwrap().collect();
    assert_eq!(names, vec!["ip", "ne"]);

    let children: Vec<_> = registry
        .traverse_children(id)
        .unwrap()
        .map(|c| c.label().to_string())
        .collect();
    assert_eq!(children, vec!["magnetics"]);

    let depths: Vec<_> = registry.walk().into_iter().map(|(d, n)| (d, n.label())).collect();
    assert_eq!(depths, vec![(0, "shot 29800"), (1, "magnetics")]);
}

#[test]
fn test_one_failure_out_of_three() {
    let (node, reads) = flaky_source(&["ne"]);
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(node);

    let selections: Vec<_> = ["ip", "ne", "te"]
        .into_iter()
        .map(|v| Selection::new(v, id))
        .collect();
    let batch = read_selection(&mut registry, &selections, &[], &default_reads(), keep_going);

    assert_eq!(reads.load(Ordering::SeqCst), 3);
    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.failures.len(), 1);
    assert!(!batch.cancelled);
    assert_eq!(batch.failures[0].variable, "ne");
    assert_eq!(
        batch.failures[0].error,
        ReadError::Failed("ne is corrupt".to_string())
    );

    let mut workspace = Workspace::new();
    let names = workspace.insert_batch(batch);
    assert_eq!(names, vec!["ip", "te"]);
    let ip = workspace.get("ip").unwrap();
    assert_eq!(ip.source, "rig");
    assert_eq!(ip.units, "au");
}

#[test]
fn test_selectors_repeat_names() {
    let (node, _) = flaky_source(&[]);
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(node);

    let selectors = vec!["100".to_string(), "200".to_string()];
    let batch = read_selection(
        &mut registry,
        &[Selection::new("ip", id)],
        &selectors,
        &default_reads(),
        keep_going,
    );
    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.items[1].selector, "200");

    let mut workspace = Workspace::new();
    let names = workspace.insert_batch(batch);
    assert_eq!(names, vec!["ip", "ip_1"]);
    assert_eq!(workspace.get("ip_1").unwrap().values(), Some(&[200.0, 201.0, 202.0][..]));
}

#[test]
fn test_cancel_keeps_partial_results() {
    let (node, reads) = flaky_source(&[]);
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(node);

    let selections: Vec<_> = ["ip", "ne", "te"]
        .into_iter()
        .map(|v| Selection::new(v, id))
        .collect();
    let mut seen = Vec::new();
    let batch = read_selection(&mut registry, &selections, &[], &default_reads(), |progress| {
        seen.push((progress.index, progress.total));
        if progress.index == 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    assert_eq!(seen, vec![(0, 3)]);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert_eq!(batch.items.len(), 1);
    assert!(batch.cancelled);
}

#[test]
fn test_removed_source_is_per_item_failure() {
    let (node, _) = flaky_source(&[]);
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(node);
    let other = registry.add_root(ShotBuilder::new("other").build());
    assert!(registry.remove_root(id));

    let batch = read_selection(
        &mut registry,
        &[Selection::new("ip", id), Selection::new("missing", other)],
        &[],
        &default_reads(),
        keep_going,
    );
    assert!(batch.items.is_empty());
    assert_eq!(batch.failures[0].error, ReadError::UnknownSource(id));
    assert!(matches!(
        batch.failures[1].error,
        ReadError::UnknownVariable { .. }
    ));
}

#[test]
fn test_grouping_node_is_not_readable() {
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(
        SourceNode::new("group").with_variable(VariableDescriptor::new("ip")),
    );
    let batch = read_selection(
        &mut registry,
        &[Selection::new("ip", id)],
        &[],
        &default_reads(),
        keep_going,
    );
    assert_eq!(
        batch.failures[0].error,
        ReadError::NotReadable("group".to_string())
    );
}

#[test]
fn test_configured_default_selector() {
    let (node, _) = flaky_source(&[]);
    let mut registry = SourceRegistry::new();
    let id = registry.add_root(node);
    let reads = ReadConfig {
        default_selector: "29800".to_string(),
    };

    let batch = read_selection(&mut registry, &[Selection::new("te", id)], &[], &reads, keep_going);
    assert!(batch.failures.is_empty());
    assert_eq!(batch.items[0].selector, "29800");
    assert_eq!(
        batch.items[0].item.values(),
        Some(&[29800.0, 29801.0, 29802.0][..])
    );
}
