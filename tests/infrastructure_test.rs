//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{ShotBuilder, TraceBuilder};
use xpad_rs::SourceRegistry;

#[test]
fn test_infrastructure_setup() {
    let node = ShotBuilder::new("shot")
        .variable("ip", TraceBuilder::new("ip").units("kA").build())
        .build();
    assert_eq!(node.kind(), Some("memory"));
    assert_eq!(node.variable("ip").map(|v| v.units()), Some("kA"));

    let mut registry = SourceRegistry::new();
    let id = registry.add_root(node);
    let item = registry.read(id, "ip", "any").unwrap();
    assert_eq!(item.source, "shot");
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
