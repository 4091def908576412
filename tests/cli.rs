//! Integration tests for the `pxo` binary, driven by replay files so no
//! network access is needed.

mod common;

use common::{replay_texts, run_pxo, write_png, write_replay};
use pxo::catalog::STEP_COUNT;
use pxo::report::AnalysisReport;
use pxo::stream::{StreamDecoder, WireEvent};
use serde_json::json;
use tempfile::TempDir;

const BRIEF: [&str; 6] = [
    "--problem",
    "Users abandon checkout",
    "--segment",
    "new users",
    "--metric",
    "conversion",
];

fn analyze_args<'a>(image: &'a str, replay: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["analyze", "--image", image, "--replay", replay];
    args.extend(BRIEF);
    args.extend_from_slice(extra);
    args
}

#[test]
fn report_mode_writes_the_full_document() {
    let dir = TempDir::new().expect("tempdir");
    let image = write_png(dir.path(), "checkout.png");
    let replay = write_replay(dir.path(), &json!(replay_texts(STEP_COUNT)));
    let out = dir.path().join("report.json");

    let image = image.to_str().expect("utf-8 path");
    let replay = replay.to_str().expect("utf-8 path");
    let out_arg = out.to_str().expect("utf-8 path");
    let output = run_pxo(&analyze_args(
        image,
        replay,
        &["--mode", "report", "--out", out_arg],
    ));
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = std::fs::read_to_string(&out).expect("read report");
    let report: AnalysisReport = serde_json::from_str(&text).expect("parse report");
    assert_eq!(report.summary, "SUM");
    assert_eq!(report.sections.len(), STEP_COUNT);
    assert_eq!(report.sections[0].title, "Problem Hypothesis");
    assert_eq!(report.sections[11].content, "STEP_11");
}

#[test]
fn stream_mode_prints_frames_to_stdout() {
    let dir = TempDir::new().expect("tempdir");
    let image = write_png(dir.path(), "checkout.png");
    let replay = write_replay(dir.path(), &json!(replay_texts(STEP_COUNT)));

    let output = run_pxo(&analyze_args(
        image.to_str().expect("utf-8 path"),
        replay.to_str().expect("utf-8 path"),
        &[],
    ));
    assert!(output.status.success());

    let mut decoder = StreamDecoder::new();
    let events = decoder.push(&output.stdout).expect("decode stdout");
    assert_eq!(decoder.pending(), 0);
    assert_eq!(events.len(), 2 + 2 * STEP_COUNT + 3);
    assert_eq!(events[1], WireEvent::ScreenshotDone);
    assert_eq!(events.last(), Some(&WireEvent::Done));
}

#[test]
fn upstream_failure_exits_nonzero_with_error_frame() {
    let dir = TempDir::new().expect("tempdir");
    let image = write_png(dir.path(), "checkout.png");
    let replay = write_replay(
        dir.path(),
        &json!(["DESC", "STEP_0", {"error": "rate limited"}]),
    );

    let output = run_pxo(&analyze_args(
        image.to_str().expect("utf-8 path"),
        replay.to_str().expect("utf-8 path"),
        &[],
    ));
    assert_eq!(output.status.code(), Some(1));

    let events = StreamDecoder::new()
        .push(&output.stdout)
        .expect("decode stdout");
    let completed = events
        .iter()
        .filter(|e| matches!(e, WireEvent::StepComplete { .. }))
        .count();
    assert_eq!(completed, 1);
    match events.last() {
        Some(WireEvent::Error { message }) => assert!(message.contains("step 1"), "{message}"),
        other => panic!("expected error frame, got {other:?}"),
    }
}

#[test]
fn report_failure_writes_error_document() {
    let dir = TempDir::new().expect("tempdir");
    let image = write_png(dir.path(), "checkout.png");
    let replay = write_replay(dir.path(), &json!(["not json at all"]));

    let output = run_pxo(&analyze_args(
        image.to_str().expect("utf-8 path"),
        replay.to_str().expect("utf-8 path"),
        &["--mode", "report", "--strategy", "single-shot"],
    ));
    assert_eq!(output.status.code(), Some(1));
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("error json");
    assert_eq!(doc["kind"], "format");
    assert!(doc["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[test]
fn missing_field_exits_with_validation_code() {
    let dir = TempDir::new().expect("tempdir");
    let image = write_png(dir.path(), "checkout.png");
    // An empty replay would fail on the first call; validation must stop first.
    let replay = write_replay(dir.path(), &json!([]));

    let output = run_pxo(&[
        "analyze",
        "--image",
        image.to_str().expect("utf-8 path"),
        "--replay",
        replay.to_str().expect("utf-8 path"),
        "--problem",
        "Users abandon checkout",
        "--segment",
        "new users",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("metric at risk is required"), "{stderr}");
}

#[test]
fn missing_image_exits_with_validation_code() {
    let mut args = vec!["analyze"];
    args.extend(BRIEF);
    let output = run_pxo(&args);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Image is required"), "{stderr}");
}

#[test]
fn steps_lists_the_catalog() {
    let output = run_pxo(&["steps", "--json"]);
    assert!(output.status.success());
    let steps: serde_json::Value = serde_json::from_slice(&output.stdout).expect("steps json");
    let steps = steps.as_array().expect("array");
    assert_eq!(steps.len(), STEP_COUNT);
    assert_eq!(steps[0]["id"], 0);
    assert_eq!(steps[0]["title"], "Problem Hypothesis");
    assert!(steps[0].get("focus").is_none());

    let output = run_pxo(&["steps"]);
    let text = String::from_utf8_lossy(&output.stdout);
    assert_eq!(text.lines().count(), STEP_COUNT);
}

#[test]
fn strategy_without_report_mode_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    let image = write_png(dir.path(), "checkout.png");
    let replay = write_replay(dir.path(), &json!(replay_texts(STEP_COUNT)));

    let output = run_pxo(&analyze_args(
        image.to_str().expect("utf-8 path"),
        replay.to_str().expect("utf-8 path"),
        &["--strategy", "single-shot"],
    ));
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--strategy only applies to --mode report"), "{stderr}");
}
