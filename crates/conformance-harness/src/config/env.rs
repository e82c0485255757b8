// crates/conformance-harness/src/config/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed configuration for conformance runs.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty values and malformed timeouts fail
//! closed with a [`ConfigError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::target::DEFAULT_TARGET;
use crate::target::TargetAddress;
use crate::target::resolve_target;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request timeout applied when no override is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Base address override for the task tracker suite.
    TaskTrackerBaseUrl,
    /// Base address override for the day server suite.
    FlaskBaseUrl,
    /// Optional timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Optional directory for run summaries.
    RunRoot,
    /// Optional JSON-lines audit log path.
    AuditLog,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskTrackerBaseUrl => "TASKTRACKER_BASE_URL",
            Self::FlaskBaseUrl => "FLASK_BASE_URL",
            Self::TimeoutSeconds => "CONFORMANCE_TIMEOUT_SEC",
            Self::RunRoot => "CONFORMANCE_RUN_ROOT",
            Self::AuditLog => "CONFORMANCE_AUDIT_LOG",
        }
    }
}

// ============================================================================
// SECTION: Suite Kinds
// ============================================================================

/// Service variants the harness knows how to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// JSON task tracker API with bearer authentication.
    TaskTracker,
    /// HTML server rendering the current day of week.
    DayServer,
}

impl SuiteKind {
    /// All known suites, in listing order.
    pub const ALL: [Self; 2] = [Self::TaskTracker, Self::DayServer];

    /// Returns the stable label for the suite.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskTracker => "tasktracker",
            Self::DayServer => "dayserver",
        }
    }

    /// Returns the environment variable that overrides this suite's target.
    #[must_use]
    pub const fn base_url_env(self) -> HarnessEnv {
        match self {
            Self::TaskTracker => HarnessEnv::TaskTrackerBaseUrl,
            Self::DayServer => HarnessEnv::FlaskBaseUrl,
        }
    }

    /// Parses a suite label, accepting `flask` as an alias for the day server.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "tasktracker" | "task-tracker" => Some(Self::TaskTracker),
            "dayserver" | "day-server" | "flask" => Some(Self::DayServer),
            _ => None,
        }
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors raised while reading the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Variable is set but not valid UTF-8.
    #[error("{name} must be valid UTF-8")]
    InvalidUtf8 {
        /// Variable name.
        name: &'static str,
    },
    /// Variable is set but empty or whitespace.
    #[error("{name} must not be empty")]
    Empty {
        /// Variable name.
        name: &'static str,
    },
    /// Variable holds an unusable value.
    #[error("{name} {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Validation failure detail.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed harness configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Suite being verified.
    pub suite: SuiteKind,
    /// Resolved base address of the service under test.
    pub target: TargetAddress,
    /// Timeout applied to every request unless a call overrides it.
    pub timeout: Duration,
    /// Optional directory receiving run summaries.
    pub run_root: Option<PathBuf>,
    /// Optional JSON-lines audit log path.
    pub audit_log: Option<PathBuf>,
    /// Whether opt-in extension scenarios run.
    pub include_extensions: bool,
}

impl HarnessConfig {
    /// Builds a configuration with defaults for everything but the target.
    #[must_use]
    pub const fn new(suite: SuiteKind, target: TargetAddress) -> Self {
        Self {
            suite,
            target,
            timeout: DEFAULT_TIMEOUT,
            run_root: None,
            audit_log: None,
            include_extensions: false,
        }
    }

    /// Loads configuration for `suite` from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an environment value is not valid UTF-8,
    /// is empty, or fails validation (for example, a zero timeout).
    pub fn load(suite: SuiteKind) -> Result<Self, ConfigError> {
        let base_url = read_env_nonempty(suite.base_url_env().as_str())?;
        let target = resolve_target(base_url.as_deref(), DEFAULT_TARGET);
        let timeout = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT);
        let run_root = read_env_nonempty(HarnessEnv::RunRoot.as_str())?.map(PathBuf::from);
        let audit_log = read_env_nonempty(HarnessEnv::AuditLog.as_str())?.map(PathBuf::from);
        Ok(Self {
            suite,
            target,
            timeout,
            run_root,
            audit_log,
            include_extensions: false,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &'static str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::InvalidUtf8 {
            name,
        })
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &'static str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(ConfigError::Empty {
            name,
        }),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Parses a positive timeout value from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_timeout_seconds(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: "must be a positive integer number of seconds",
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero",
        });
    }
    Ok(Duration::from_secs(secs))
}
