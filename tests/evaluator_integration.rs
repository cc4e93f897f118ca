//! Integration tests for expression evaluation over the workspace
//!
//! These tests validate the evaluator with the standard bindings:
//! - Arithmetic between workspace entries
//! - Error reporting without side effects
//! - Plot and FFT bindings driven from expressions

mod common;

use common::builders::TraceBuilder;
use common::{assert_float_eq, assert_slice_eq};
use std::sync::{Arc, Mutex};
use xpad_rs::config::{EvaluatorConfig, PlotConfig};
use xpad_rs::plot::{Figure, RecordingPlotter, SharedPlotBackend};
use xpad_rs::scripting::builtins;
use xpad_rs::{CommandEvaluator, DataItem, DataValue, EvaluationErrorKind, Workspace};

fn setup() -> (Arc<Mutex<RecordingPlotter>>, CommandEvaluator, Workspace) {
    let recorder = Arc::new(Mutex::new(RecordingPlotter::new()));
    let shared: SharedPlotBackend = recorder.clone();
    let evaluator = CommandEvaluator::with_bindings(
        EvaluatorConfig::default(),
        builtins::standard(shared, &PlotConfig { max_points: 100 }),
    );

    let mut workspace = Workspace::new();
    workspace
        .insert("a", DataItem::series("a", vec![1.0, 2.0, 3.0]))
        .unwrap();
    workspace
        .insert("b", DataItem::series("b", vec![10.0, 20.0, 30.0]))
        .unwrap();
    (recorder, evaluator, workspace)
}

#[test]
fn test_sum_of_entries() {
    let (_, mut evaluator, mut workspace) = setup();
    let report = evaluator.evaluate(&mut workspace, "c = a + b");
    assert!(report.is_ok(), "{:?}", report.outcome);
    assert_eq!(
        workspace.get("c").unwrap().value,
        DataValue::Series(vec![11.0, 22.0, 33.0])
    );
    assert_eq!(workspace.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[test]
fn test_unknown_name_leaves_workspace() {
    let (_, mut evaluator, mut workspace) = setup();
    let revision = workspace.revision();
    let report = evaluator.evaluate(&mut workspace, "d = unknown_name");

    let error = report.error().unwrap();
    assert!(error.is_name_error());
    assert!(error.to_string().starts_with("NameError"));
    assert!(!workspace.contains("d"));
    assert_eq!(workspace.revision(), revision);
}

#[test]
fn test_scaling_and_functions() {
    let (_, mut evaluator, mut workspace) = setup();
    let report = evaluator.evaluate(&mut workspace, "s = sqrt(b / 10) * 2; n = -a");
    assert!(report.is_ok(), "{:?}", report.outcome);
    assert_slice_eq(
        workspace.get("s").unwrap().values().unwrap(),
        &[2.0, 2.0 * 2f64.sqrt(), 2.0 * 3f64.sqrt()],
        1e-12,
    );
    assert_eq!(workspace.get("n").unwrap().values(), Some(&[-1.0, -2.0, -3.0][..]));
}

#[test]
fn test_plot_from_expression() {
    let (recorder, mut evaluator, mut workspace) = setup();
    workspace
        .insert("ip", TraceBuilder::new("ip").sampled(250, |t| t).build())
        .unwrap();

    let report = evaluator.evaluate(&mut workspace, "plot(ip, [a, b])");
    assert!(report.is_ok(), "{:?}", report.outcome);
    assert!(report.output.contains("too many samples (250)"));

    let recorder = recorder.lock().unwrap();
    let Some(Figure::Lines { panels }) = recorder.last() else {
        panic!("expected a line figure");
    };
    assert_eq!(panels.len(), 2);
    assert!(panels[0].traces[0].x.len() <= 100);
    assert_eq!(panels[1].traces.len(), 2);
}

#[test]
fn test_contour_of_trace_writes_message() {
    let (recorder, mut evaluator, mut workspace) = setup();
    let report = evaluator.evaluate(&mut workspace, "contour(a)");
    assert!(report.is_ok());
    assert_eq!(report.output, "Data must be 2 dimensional\n");
    assert!(recorder.lock().unwrap().figures().is_empty());
}

#[test]
fn test_fft_pair_indexing() {
    let (_, mut evaluator, mut workspace) = setup();
    workspace
        .insert(
            "sig",
            TraceBuilder::new("sig")
                .step(0.001)
                .sampled(8, |t| (2.0 * std::f64::consts::PI * 250.0 * t).cos())
                .build(),
        )
        .unwrap();

    let report = evaluator.evaluate(&mut workspace, "spec = fftp(sig); amp = spec[0]");
    assert!(report.is_ok(), "{:?}", report.outcome);

    let spec = workspace.get("spec").unwrap();
    assert!(matches!(&spec.value, DataValue::Tuple(items) if items.len() == 2));

    let amp = workspace.get("amp").unwrap();
    assert_eq!(amp.name, "AMP( sig )");
    let freq = amp.dims[0].data.as_deref().unwrap();
    assert_slice_eq(freq, &[0.0, 0.125, 0.25, 0.375, 0.5], 1e-12);
    let values = amp.values().unwrap();
    assert_float_eq(values[2], 0.5, 1e-12);
}

#[test]
fn test_wrong_argument_is_type_error() {
    let (_, mut evaluator, mut workspace) = setup();
    let report = evaluator.evaluate(&mut workspace, "x = integrate(\"a\")");
    assert_eq!(report.error().unwrap().kind, EvaluationErrorKind::Type);

    let report = evaluator.evaluate(&mut workspace, "x = integrate(a, b)");
    assert_eq!(report.error().unwrap().kind, EvaluationErrorKind::Type);
    assert!(!workspace.contains("x"));
}
