// crates/conformance-harness/src/audit.rs
// ============================================================================
// Module: Harness Audit Logging
// Description: Structured audit events for requests, provisioning and scenarios.
// Purpose: Emit JSON-lines logs without hard dependencies on a logging stack.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for harness activity.
//! Every event is a flat JSON object with an `event` discriminator and a
//! millisecond timestamp, so runs can be replayed from the log alone.
//! Bearer tokens are never part of any payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outbound HTTP request audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// HTTP method.
    pub method: String,
    /// Fully resolved request URL.
    pub url: String,
    /// Whether the request carried a bearer credential.
    pub authenticated: bool,
    /// Response status when a response arrived.
    pub status: Option<u16>,
    /// Transport error when no response arrived.
    pub error: Option<String>,
    /// Time until the response head arrived, in milliseconds.
    pub elapsed_ms: u64,
}

impl RequestAuditEvent {
    /// Creates a request event with a consistent timestamp.
    #[must_use]
    pub fn new(
        method: &str,
        url: &str,
        authenticated: bool,
        outcome: Result<u16, String>,
        elapsed: Duration,
    ) -> Self {
        let (status, error) = match outcome {
            Ok(status) => (Some(status), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            event: "http_request",
            timestamp_ms: now_millis(),
            method: method.to_string(),
            url: url.to_string(),
            authenticated,
            status,
            error,
            elapsed_ms: duration_millis(elapsed),
        }
    }
}

/// Identity provisioning audit event.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Synthetic username being provisioned.
    pub username: String,
    /// Protocol step (`register` or `login`).
    pub stage: &'static str,
    /// Response status when a response arrived.
    pub status: Option<u16>,
    /// Step outcome label.
    pub outcome: &'static str,
}

impl ProvisionAuditEvent {
    /// Creates a provisioning event with a consistent timestamp.
    #[must_use]
    pub fn new(
        username: &str,
        stage: &'static str,
        status: Option<u16>,
        outcome: &'static str,
    ) -> Self {
        Self {
            event: "identity_provision",
            timestamp_ms: now_millis(),
            username: username.to_string(),
            stage,
            status,
            outcome,
        }
    }
}

/// Scenario completion audit event.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Suite label.
    pub suite: &'static str,
    /// Scenario group label.
    pub group: &'static str,
    /// Scenario name.
    pub scenario: &'static str,
    /// Outcome label (`pass`, `fail`, `skip`).
    pub outcome: &'static str,
    /// Failure or skip detail.
    pub message: Option<String>,
    /// Scenario wall time in milliseconds.
    pub duration_ms: u64,
}

/// Inputs for [`ScenarioAuditEvent::new`].
pub struct ScenarioAuditEventParams {
    /// Suite label.
    pub suite: &'static str,
    /// Scenario group label.
    pub group: &'static str,
    /// Scenario name.
    pub scenario: &'static str,
    /// Outcome label.
    pub outcome: &'static str,
    /// Failure or skip detail.
    pub message: Option<String>,
    /// Scenario wall time.
    pub duration: Duration,
}

impl ScenarioAuditEvent {
    /// Creates a scenario event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ScenarioAuditEventParams) -> Self {
        Self {
            event: "scenario_result",
            timestamp_ms: now_millis(),
            suite: params.suite,
            group: params.group,
            scenario: params.scenario,
            outcome: params.outcome,
            message: params.message,
            duration_ms: duration_millis(params.duration),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for harness events.
pub trait AuditSink: Send + Sync {
    /// Record an outbound request.
    fn record_request(&self, event: &RequestAuditEvent);

    /// Record an identity provisioning step.
    fn record_provision(&self, _event: &ProvisionAuditEvent) {}

    /// Record a scenario outcome.
    fn record_scenario(&self, _event: &ScenarioAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        write_stderr_json(event);
    }

    fn record_provision(&self, event: &ProvisionAuditEvent) {
        write_stderr_json(event);
    }

    fn record_scenario(&self, event: &ScenarioAuditEvent) {
        write_stderr_json(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event and flushes it.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.append(event);
    }

    fn record_provision(&self, event: &ProvisionAuditEvent) {
        self.append(event);
    }

    fn record_scenario(&self, event: &ScenarioAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_request(&self, _event: &RequestAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch, saturating to zero on clock skew.
pub(crate) fn now_millis() -> u64 {
    duration_millis(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default())
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
///
/// Serialized timings stay `u64` so canonical JSON emits plain numbers.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Serializes `event` as one line on stderr.
fn write_stderr_json<T: Serialize>(event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
