// crates/conformance-harness/src/report.rs
// ============================================================================
// Module: Run Report
// Description: Per-scenario outcomes and run summaries.
// Purpose: Render results for terminals and persist deterministic artifacts.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! A [`RunReport`] collects one [`ScenarioRecord`] per executed scenario, in
//! execution order. It renders as plain text for the terminal, as Markdown
//! for humans browsing artifacts, and as canonical JSON (RFC 8785 via
//! `serde_jcs`) so summaries from different runs diff cleanly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::audit::duration_millis;
use crate::audit::now_millis;
use crate::config::SuiteKind;
use crate::target::TargetAddress;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the canonical JSON summary.
pub const SUMMARY_JSON: &str = "summary.json";
/// File name of the Markdown summary.
pub const SUMMARY_MARKDOWN: &str = "summary.md";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of a single scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every assertion held.
    Pass,
    /// An assertion failed or the target was unreachable.
    Fail,
    /// The target does not support an optional feature.
    Skip,
}

impl ScenarioOutcome {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }

    /// Returns the uppercase terminal label.
    const fn banner(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }
}

/// Recorded outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioRecord {
    /// Scenario group label.
    pub group: &'static str,
    /// Scenario name.
    pub name: &'static str,
    /// Outcome.
    pub outcome: ScenarioOutcome,
    /// Failure or skip detail.
    pub message: Option<String>,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
}

impl ScenarioRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(
        group: &'static str,
        name: &'static str,
        outcome: ScenarioOutcome,
        message: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            group,
            name,
            outcome,
            message,
            duration_ms: duration_millis(duration),
        }
    }

    /// Returns `group/name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}

/// Outcome tallies for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    /// Passed scenarios.
    pub passed: usize,
    /// Failed scenarios.
    pub failed: usize,
    /// Skipped scenarios.
    pub skipped: usize,
}

impl OutcomeCounts {
    /// Total scenarios counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Aggregated results of one suite run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Suite that ran.
    pub suite: SuiteKind,
    /// Target the suite ran against.
    pub target: TargetAddress,
    /// Run start (milliseconds since epoch).
    pub started_at_ms: u64,
    /// Run end (milliseconds since epoch); equals the start until finished.
    pub ended_at_ms: u64,
    /// Outcome tallies.
    pub counts: OutcomeCounts,
    /// Records in execution order.
    pub records: Vec<ScenarioRecord>,
}

/// Paths written by [`RunReport::write_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    /// Canonical JSON summary.
    pub json: PathBuf,
    /// Markdown summary.
    pub markdown: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while persisting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report directory could not be created.
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// I/O error.
        source: std::io::Error,
    },
    /// Canonical serialization failed.
    #[error("failed to serialize report: {0}")]
    Serialize(String),
    /// An artifact could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Artifact path.
        path: PathBuf,
        /// I/O error.
        source: std::io::Error,
    },
}

// ============================================================================
// SECTION: Report
// ============================================================================

impl RunReport {
    /// Starts an empty report stamped with the current time.
    #[must_use]
    pub fn new(suite: SuiteKind, target: TargetAddress) -> Self {
        let started_at_ms = now_millis();
        Self {
            suite,
            target,
            started_at_ms,
            ended_at_ms: started_at_ms,
            counts: OutcomeCounts::default(),
            records: Vec::new(),
        }
    }

    /// Appends a record and updates the tallies.
    pub fn push(&mut self, record: ScenarioRecord) {
        match record.outcome {
            ScenarioOutcome::Pass => self.counts.passed += 1,
            ScenarioOutcome::Fail => self.counts.failed += 1,
            ScenarioOutcome::Skip => self.counts.skipped += 1,
        }
        self.records.push(record);
    }

    /// Stamps the end time.
    pub fn finish(&mut self) {
        self.ended_at_ms = now_millis();
    }

    /// Run wall time in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.ended_at_ms.saturating_sub(self.started_at_ms)
    }

    /// True when no scenario failed. Skips do not count against a run.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.counts.failed == 0
    }

    /// Looks up a record by scenario name.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&ScenarioRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    /// Renders one line per scenario followed by a tally line.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} suite against {}", self.suite, self.target);
        for record in &self.records {
            let _ = write!(
                out,
                "{} {} ({} ms)",
                record.outcome.banner(),
                record.qualified_name(),
                record.duration_ms
            );
            if let Some(message) = &record.message {
                let _ = write!(out, ": {message}");
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{} passed, {} failed, {} skipped",
            self.counts.passed, self.counts.failed, self.counts.skipped
        );
        out
    }

    /// Renders a Markdown summary with a scenario table.
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Conformance Summary\n\n");
        out.push_str("## Run\n\n");
        let _ = writeln!(out, "- Suite: {}", self.suite);
        let _ = writeln!(out, "- Target: {}", self.target);
        let _ = writeln!(out, "- Duration (ms): {}", self.duration_ms());
        let _ = writeln!(out, "- Passed: {}", self.counts.passed);
        let _ = writeln!(out, "- Failed: {}", self.counts.failed);
        let _ = writeln!(out, "- Skipped: {}", self.counts.skipped);
        out.push_str("\n## Scenarios\n\n");
        if self.records.is_empty() {
            out.push_str("- None\n");
            return out;
        }
        out.push_str("| Scenario | Outcome | Duration (ms) | Detail |\n");
        out.push_str("| --- | --- | --- | --- |\n");
        for record in &self.records {
            let detail = record.message.as_deref().map(markdown_cell).unwrap_or_default();
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                record.qualified_name(),
                record.outcome.as_str(),
                record.duration_ms,
                detail
            );
        }
        out
    }

    /// Writes `summary.json` (canonical JSON) and `summary.md` under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the directory or either file cannot be
    /// written.
    pub fn write_artifacts(&self, dir: &Path) -> Result<ReportArtifacts, ReportError> {
        fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let bytes = serde_jcs::to_vec(self).map_err(|err| ReportError::Serialize(err.to_string()))?;
        let json = write_file(dir, SUMMARY_JSON, &bytes)?;
        let markdown = write_file(dir, SUMMARY_MARKDOWN, self.render_markdown().as_bytes())?;
        Ok(ReportArtifacts {
            json,
            markdown,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes `bytes` to `dir/name`.
fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
    let path = dir.join(name);
    fs::write(&path, bytes).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Flattens text into a single Markdown table cell.
fn markdown_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
