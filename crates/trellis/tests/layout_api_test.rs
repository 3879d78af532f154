//! Integration tests for the AutoLayout API
//!
//! Snapshots are written as the editor would send them, in JSON.

use std::fs;

use float_cmp::assert_approx_eq;

use trellis::{
    AutoLayout, CancellationToken, LayoutOutput, TrellisError,
    config::{Direction, load_config},
    geometry::Point,
    graph::GraphSnapshot,
    identifier::Id,
};

fn snapshot(json: &str) -> GraphSnapshot {
    serde_json::from_str(json).expect("snapshot parses")
}

fn run(layout: &AutoLayout, snapshot: &GraphSnapshot) -> LayoutOutput {
    layout
        .layout(snapshot, &CancellationToken::new())
        .expect("layout succeeds")
}

fn position(output: &LayoutOutput, id: &str) -> Point {
    output
        .node(Id::new(id))
        .map(|node| node.position())
        .unwrap_or_else(|| panic!("{id} is placed"))
}

const BRANCHING: &str = r#"{
    "nodes": [
        { "id": "start", "role": { "kind": "start" }, "position": { "x": 40.0, "y": 40.0 } },
        {
            "id": "check",
            "role": { "kind": "branch", "cases": ["approved", "rejected"], "defaultCase": "other" }
        },
        { "id": "notify" },
        { "id": "archive" },
        { "id": "escalate" },
        { "id": "note", "role": { "kind": "annotation" } }
    ],
    "edges": [
        { "id": "e0", "source": "start", "target": "check" },
        { "id": "e1", "source": "check", "target": "escalate", "sourcePort": "other" },
        { "id": "e2", "source": "check", "target": "archive", "sourcePort": "rejected" },
        { "id": "e3", "source": "check", "target": "notify", "sourcePort": "approved" }
    ],
    "viewport": { "x": 10.0, "y": 20.0, "zoom": 0.5 }
}"#;

#[test]
fn test_single_node_lands_at_origin() {
    let input = snapshot(r#"{ "nodes": [{ "id": "only" }] }"#);

    let output = run(&AutoLayout::default(), &input);

    assert_eq!(output.nodes().len(), 1);
    assert_eq!(position(&output, "only"), Point::new(0.0, 0.0));
}

#[test]
fn test_branch_successors_follow_case_order() {
    let output = run(&AutoLayout::default(), &snapshot(BRANCHING));

    let notify = position(&output, "notify");
    let archive = position(&output, "archive");
    let escalate = position(&output, "escalate");

    assert!(notify.y() < archive.y());
    assert!(archive.y() < escalate.y());
    assert_approx_eq!(f32, notify.x(), archive.x());
    assert!(output.node(Id::new("note")).is_none());
}

#[test]
fn test_viewport_compensates_anchor_shift() {
    let output = run(&AutoLayout::default(), &snapshot(BRANCHING));

    assert_eq!(output.anchor(), Some(Id::new("start")));
    let start = position(&output, "start");
    let viewport = output.viewport().expect("viewport is reconciled");

    let expected_x = 10.0 + (40.0 - start.x()) * 0.5;
    let expected_y = 20.0 + (40.0 - start.y()) * 0.5;
    assert_approx_eq!(f32, viewport.x(), expected_x, epsilon = 1e-3);
    assert_approx_eq!(f32, viewport.y(), expected_y, epsilon = 1e-3);
    assert_approx_eq!(f32, viewport.zoom(), 0.5);
}

#[test]
fn test_layout_is_deterministic() {
    let layout = AutoLayout::default();
    let input = snapshot(BRANCHING);

    let first = run(&layout, &input);
    let second = run(&layout, &input);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("output serializes"),
        serde_json::to_string(&second).expect("output serializes"),
    );
}

#[test]
fn test_container_content_is_nested() {
    let input = snapshot(
        r#"{
        "nodes": [
            { "id": "start", "role": { "kind": "start" } },
            { "id": "loop", "role": { "kind": "container" } },
            {
                "id": "loop-start",
                "container": "loop",
                "role": { "kind": "container-entry" },
                "size": { "width": 44.0, "height": 48.0 }
            },
            { "id": "body", "container": "loop" },
            { "id": "after" }
        ],
        "edges": [
            { "id": "e1", "source": "start", "target": "loop" },
            { "id": "e2", "source": "loop-start", "target": "body", "inContainer": true },
            { "id": "e3", "source": "loop", "target": "after" }
        ]
    }"#,
    );

    let output = run(&AutoLayout::default(), &input);

    let container = output.node(Id::new("loop")).expect("container is placed");
    let entry = position(&output, "loop-start");
    let body = position(&output, "body");

    assert_approx_eq!(f32, entry.x(), container.position().x() + 16.0);
    assert!(entry.y() >= container.position().y() + 65.0);
    assert!(body.x() > entry.x());

    let right = container.position().x() + container.size().width();
    let bottom = container.position().y() + container.size().height();
    assert!(body.x() + 240.0 <= right + 1e-3);
    assert!(body.y() + 90.0 <= bottom + 1e-3);

    assert_eq!(
        output.node(Id::new("body")).and_then(|node| node.container()),
        Some(Id::new("loop"))
    );
    assert!(position(&output, "after").x() >= right + 80.0 - 1e-3);
}

#[test]
fn test_cycle_is_broken_once() {
    let input = snapshot(
        r#"{
        "nodes": [{ "id": "a" }, { "id": "b" }, { "id": "c" }],
        "edges": [
            { "id": "ab", "source": "a", "target": "b" },
            { "id": "bc", "source": "b", "target": "c" },
            { "id": "ca", "source": "c", "target": "a" }
        ]
    }"#,
    );

    let output = run(&AutoLayout::default(), &input);

    assert_eq!(output.feedback_edges(), &[Id::new("ca")]);
    assert!(position(&output, "a").x() < position(&output, "b").x());
    assert!(position(&output, "b").x() < position(&output, "c").x());
}

#[test]
fn test_malformed_input_is_repaired() {
    let input = snapshot(
        r#"{
        "nodes": [
            { "id": "a" },
            { "id": "a" },
            { "id": "orphan", "container": "missing" }
        ],
        "edges": [
            { "id": "dangling", "source": "a", "target": "nowhere" },
            { "id": "self", "source": "a", "target": "a" }
        ]
    }"#,
    );

    let output = run(&AutoLayout::default(), &input);

    assert_eq!(output.nodes().len(), 2);
    let orphan = output.node(Id::new("orphan")).expect("orphan is placed");
    assert_eq!(orphan.container(), None);
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("layout.toml");
    fs::write(&path, "direction = \"top-to-bottom\"\nlayer_gap = 100.0\n").expect("write config");

    let config = load_config(&path).expect("config loads");
    assert_eq!(config.direction(), Direction::TopToBottom);

    let input = snapshot(
        r#"{
        "nodes": [{ "id": "a" }, { "id": "b" }],
        "edges": [{ "id": "ab", "source": "a", "target": "b" }]
    }"#,
    );
    let output = run(&AutoLayout::new(config), &input);

    let a = position(&output, "a");
    let b = position(&output, "b");
    assert_approx_eq!(f32, a.x(), b.x());
    assert_approx_eq!(f32, b.y(), 90.0 + 100.0);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().expect("create temp dir");

    let result = load_config(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(TrellisError::Io(_))));
}

#[test]
fn test_cancelled_layout_produces_no_output() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = AutoLayout::default().layout(&snapshot(BRANCHING), &cancel);

    assert!(matches!(result, Err(TrellisError::Cancelled)));
}
