// crates/conformance-harness/src/report/tests.rs
// ============================================================================
// Module: Run Report Unit Tests
// Description: Unit coverage for tallies, rendering and artifacts.
// Purpose: Keep report output stable and skip-tolerant.
// Dependencies: serde_json, tempfile
// ============================================================================

//! ## Overview
//! Unit coverage for report tallies, renderers and artifact writing.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::time::Duration;

use serde_json::Value;

use super::RunReport;
use super::SUMMARY_JSON;
use super::SUMMARY_MARKDOWN;
use super::ScenarioOutcome;
use super::ScenarioRecord;
use crate::config::SuiteKind;
use crate::target::TargetAddress;

fn sample_report() -> RunReport {
    let mut report = RunReport::new(SuiteKind::TaskTracker, TargetAddress::new("http://127.0.0.1:9"));
    report.push(ScenarioRecord::new(
        "auth",
        "register_new_identity",
        ScenarioOutcome::Pass,
        None,
        Duration::from_millis(4),
    ));
    report.push(ScenarioRecord::new(
        "tasks",
        "create_task_without_title",
        ScenarioOutcome::Fail,
        Some("expected status 400, got 201 | body: {}".to_string()),
        Duration::from_millis(7),
    ));
    report.push(ScenarioRecord::new(
        "tasks",
        "filter_tasks_by_status",
        ScenarioOutcome::Skip,
        Some("status filter not supported".to_string()),
        Duration::from_millis(1),
    ));
    report.finish();
    report
}

#[test]
fn push_tallies_each_outcome() {
    let report = sample_report();
    assert_eq!(report.counts.passed, 1);
    assert_eq!(report.counts.failed, 1);
    assert_eq!(report.counts.skipped, 1);
    assert_eq!(report.counts.total(), 3);
    assert!(!report.is_success());
    assert!(report.ended_at_ms >= report.started_at_ms);
}

#[test]
fn skips_do_not_fail_a_run() {
    let mut report = RunReport::new(SuiteKind::DayServer, TargetAddress::new("http://localhost:8000"));
    report.push(ScenarioRecord::new(
        "rendering",
        "index_responds",
        ScenarioOutcome::Skip,
        Some("unsupported".to_string()),
        Duration::ZERO,
    ));
    assert!(report.is_success());
}

#[test]
fn render_text_lists_records_in_order() {
    let text = sample_report().render_text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "tasktracker suite against http://127.0.0.1:9");
    assert_eq!(lines[1], "PASS auth/register_new_identity (4 ms)");
    assert!(lines[2].starts_with("FAIL tasks/create_task_without_title (7 ms): expected status 400"));
    assert_eq!(lines[3], "SKIP tasks/filter_tasks_by_status (1 ms): status filter not supported");
    assert_eq!(lines[4], "1 passed, 1 failed, 1 skipped");
}

#[test]
fn render_markdown_escapes_table_cells() {
    let markdown = sample_report().render_markdown();
    assert!(markdown.starts_with("# Conformance Summary\n"));
    assert!(markdown.contains("- Suite: tasktracker\n"));
    assert!(markdown.contains("| tasks/create_task_without_title | fail | 7 | expected status 400, got 201 \\| body: {} |"));
    assert!(markdown.contains("| auth/register_new_identity | pass | 4 |  |"));
}

#[test]
fn render_markdown_handles_empty_runs() {
    let report = RunReport::new(SuiteKind::DayServer, TargetAddress::new("http://localhost:8000"));
    assert!(report.render_markdown().ends_with("## Scenarios\n\n- None\n"));
}

#[test]
fn write_artifacts_emits_canonical_json_and_markdown() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("runs").join("latest");
    let report = sample_report();

    let artifacts = report.write_artifacts(&nested).expect("write artifacts");
    assert_eq!(artifacts.json, nested.join(SUMMARY_JSON));
    assert_eq!(artifacts.markdown, nested.join(SUMMARY_MARKDOWN));

    let raw = std::fs::read_to_string(&artifacts.json).expect("read json");
    assert!(raw.starts_with("{\"counts\":{\"failed\":1,\"passed\":1,\"skipped\":1}"));
    let parsed: Value = serde_json::from_str(&raw).expect("parse json");
    assert_eq!(parsed["suite"], "tasktracker");
    assert_eq!(parsed["target"], "http://127.0.0.1:9");
    assert_eq!(parsed["records"][2]["outcome"], "skip");
    assert_eq!(parsed["records"][0]["message"], Value::Null);

    let markdown = std::fs::read_to_string(&artifacts.markdown).expect("read markdown");
    assert_eq!(markdown, report.render_markdown());
}

#[test]
fn record_lookup_by_name() {
    let report = sample_report();
    let record = report.record("filter_tasks_by_status").expect("record");
    assert_eq!(record.outcome, ScenarioOutcome::Skip);
    assert_eq!(record.qualified_name(), "tasks/filter_tasks_by_status");
    assert!(report.record("missing").is_none());
}

#[test]
fn canonical_summary_keeps_timings_as_numbers() {
    let report = sample_report();
    let bytes = serde_jcs::to_vec(&report).expect("canonical json");
    let parsed: Value = serde_json::from_slice(&bytes).expect("valid json");
    assert_eq!(parsed["started_at_ms"].as_u64(), Some(report.started_at_ms));
    assert_eq!(parsed["ended_at_ms"].as_u64(), Some(report.ended_at_ms));
    assert_eq!(parsed["records"][1]["duration_ms"], 7);
}

#[test]
fn record_duration_saturates_instead_of_wrapping() {
    let record = ScenarioRecord::new("tasks", "list_tasks", ScenarioOutcome::Pass, None, Duration::MAX);
    assert_eq!(record.duration_ms, u64::MAX);
}
