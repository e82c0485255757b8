// crates/conformance-harness/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Run-level error taxonomy.
// Purpose: Separate fatal session failures from per-scenario outcomes.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`HarnessError`] covers failures that abort a run before or after the
//! scenario battery: bad configuration, an unbuildable client, session
//! identity provisioning, readiness, and artifact writing. Failures inside a
//! scenario never surface here; they become records in the run report.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::readiness::ReadinessError;
use crate::report::ReportError;

/// Fatal run errors.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The HTTP client could not be constructed.
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    /// The session identity could not be registered or logged in.
    #[error("identity provisioning failed: {0}")]
    Provisioning(IdentityError),
    /// Login answered 200 without an accepted token shape.
    #[error("target violated the login contract: {0}")]
    ContractViolation(IdentityError),
    /// The target never answered the readiness probe.
    #[error(transparent)]
    NotReady(#[from] ReadinessError),
    /// The audit log could not be opened.
    #[error("failed to open audit log {path}: {source}")]
    AuditLog {
        /// Audit log path.
        path: PathBuf,
        /// I/O error.
        source: std::io::Error,
    },
    /// Report artifacts could not be written.
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<IdentityError> for HarnessError {
    fn from(err: IdentityError) -> Self {
        if err.is_contract_violation() {
            Self::ContractViolation(err)
        } else {
            Self::Provisioning(err)
        }
    }
}
