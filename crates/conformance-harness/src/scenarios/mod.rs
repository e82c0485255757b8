// crates/conformance-harness/src/scenarios/mod.rs
// ============================================================================
// Module: Scenario Engine
// Description: Scenario registry, execution context and suite runner.
// Purpose: Run independent contract checks and record one outcome per check.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`Scenario`] is a named, self-contained contract check. Scenarios are
//! grouped by concern and assembled into a [`Suite`] per [`SuiteKind`].
//! [`run_suite`] provisions the session identity first when the suite needs
//! one (failures there abort the run), then executes every scenario in order.
//! A scenario failure is recorded and never stops its siblings.
//!
//! Invariants:
//! - Scenarios never retry. The only alternate path is the PUT to PATCH
//!   fallback in the update check.
//! - Each scenario creates its own identities and resources.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod auth;
mod categories;
mod expect;
mod isolation;
mod projects;
mod rendering;
mod requirements;
mod tasks;
mod validation;


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use thiserror::Error;

use crate::audit::ScenarioAuditEvent;
use crate::audit::ScenarioAuditEventParams;
use crate::client::ClientError;
use crate::client::ScopedClient;
use crate::config::SuiteKind;
use crate::error::HarnessError;
use crate::identity::IdentityError;
use crate::identity::Provisioner;
use crate::report::RunReport;
use crate::report::ScenarioOutcome;
use crate::report::ScenarioRecord;
use crate::session::HarnessSession;
use crate::target::TargetAddress;

pub use rendering::current_day_name;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Concern a scenario checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioGroup {
    /// Registration, login and bearer enforcement.
    Auth,
    /// Task CRUD lifecycle.
    Tasks,
    /// Cross-identity ownership isolation.
    Isolation,
    /// Input validation on registration and task creation.
    Validation,
    /// Project resource and task grouping.
    Projects,
    /// Category or tag labels.
    Categories,
    /// Server-rendered HTML page.
    Rendering,
    /// Deployment requirements such as the listening port.
    Requirements,
}

impl ScenarioGroup {
    /// Returns the group label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Tasks => "tasks",
            Self::Isolation => "isolation",
            Self::Validation => "validation",
            Self::Projects => "projects",
            Self::Categories => "categories",
            Self::Rendering => "rendering",
            Self::Requirements => "requirements",
        }
    }
}

/// One contract check.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// Unique scenario name.
    pub name: &'static str,
    /// Group the scenario belongs to.
    pub group: ScenarioGroup,
    /// One-line description of the contract being checked.
    pub description: &'static str,
    /// Opt-in check outside the core contract.
    pub extension: bool,
    /// Check body.
    pub run: fn(&ScenarioContext<'_>) -> Result<(), ScenarioError>,
}

impl Scenario {
    /// Returns `group/name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.group.as_str(), self.name)
    }
}

/// Why a scenario did not pass.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The target answered with a status outside the accepted set.
    #[error("{check}: expected status {expected}, got {status}; body: {body}")]
    UnexpectedStatus {
        /// Check label.
        check: &'static str,
        /// Accepted statuses, rendered.
        expected: String,
        /// Observed status.
        status: u16,
        /// Body excerpt.
        body: String,
    },
    /// A body or header assertion failed.
    #[error("{check}: {detail}")]
    Assertion {
        /// Check label.
        check: &'static str,
        /// Expected versus observed.
        detail: String,
    },
    /// No response arrived.
    #[error("target unreachable: {0}")]
    Transport(#[from] ClientError),
    /// An identity needed by the scenario could not be provisioned.
    #[error("identity: {0}")]
    Identity(#[from] IdentityError),
    /// The target does not implement an optional contract.
    #[error("{0}")]
    Skipped(String),
}

/// Borrowed view of the session handed to each scenario.
pub struct ScenarioContext<'a> {
    /// Session shared by every scenario in the run.
    session: &'a HarnessSession,
}

impl<'a> ScenarioContext<'a> {
    /// Wraps a session.
    #[must_use]
    pub const fn new(session: &'a HarnessSession) -> Self {
        Self {
            session,
        }
    }

    /// Returns the target under test.
    #[must_use]
    pub const fn target(&self) -> &'a TargetAddress {
        &self.session.config().target
    }

    /// Returns an unauthenticated client.
    #[must_use]
    pub fn anonymous(&self) -> ScopedClient {
        self.session.anonymous()
    }

    /// Returns a client carrying the session credential.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Identity`] when provisioning fails.
    pub fn authenticated(&self) -> Result<ScopedClient, ScenarioError> {
        Ok(self.session.authenticated()?)
    }

    /// Returns a provisioner for additional identities.
    #[must_use]
    pub fn provisioner(&self) -> Provisioner {
        self.session.provisioner()
    }

    /// Returns the underlying session.
    #[must_use]
    pub const fn session(&self) -> &'a HarnessSession {
        self.session
    }
}

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Ordered scenario list for one target kind.
#[derive(Debug, Clone)]
pub struct Suite {
    /// Target kind.
    kind: SuiteKind,
    /// Scenarios in execution order.
    scenarios: Vec<Scenario>,
}

impl Suite {
    /// Every scenario known for `kind`, extensions included.
    #[must_use]
    pub fn catalog(kind: SuiteKind) -> Vec<Scenario> {
        let groups: &[&[Scenario]] = match kind {
            SuiteKind::TaskTracker => &[
                auth::SCENARIOS,
                tasks::SCENARIOS,
                isolation::SCENARIOS,
                validation::SCENARIOS,
                projects::SCENARIOS,
                categories::SCENARIOS,
            ],
            SuiteKind::DayServer => &[rendering::SCENARIOS, requirements::SCENARIOS],
        };
        groups.iter().flat_map(|group| group.iter().copied()).collect()
    }

    /// Builds the suite for `kind`, optionally including extension checks.
    #[must_use]
    pub fn for_kind(kind: SuiteKind, include_extensions: bool) -> Self {
        let scenarios = Self::catalog(kind)
            .into_iter()
            .filter(|scenario| include_extensions || !scenario.extension)
            .collect();
        Self {
            kind,
            scenarios,
        }
    }

    /// Returns the target kind.
    #[must_use]
    pub const fn kind(&self) -> SuiteKind {
        self.kind
    }

    /// Returns the scenarios in execution order.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// True when the suite needs a session credential before it starts.
    #[must_use]
    pub const fn requires_credential(&self) -> bool {
        matches!(self.kind, SuiteKind::TaskTracker)
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs every scenario in `suite` and returns the report.
///
/// # Errors
///
/// Returns [`HarnessError::Provisioning`] or
/// [`HarnessError::ContractViolation`] when the session identity cannot be
/// established. No scenario runs in that case.
pub fn run_suite(session: &HarnessSession, suite: &Suite) -> Result<RunReport, HarnessError> {
    if suite.requires_credential() {
        session.credential()?;
    }
    let audit = session.audit();
    let context = ScenarioContext::new(session);
    let mut report = RunReport::new(suite.kind(), session.config().target.clone());
    for scenario in suite.scenarios() {
        let started = Instant::now();
        let result = (scenario.run)(&context);
        let duration = started.elapsed();
        let (outcome, message) = classify(result);
        audit.record_scenario(&ScenarioAuditEvent::new(ScenarioAuditEventParams {
            suite: suite.kind().as_str(),
            group: scenario.group.as_str(),
            scenario: scenario.name,
            outcome: outcome.as_str(),
            message: message.clone(),
            duration,
        }));
        report.push(ScenarioRecord::new(
            scenario.group.as_str(),
            scenario.name,
            outcome,
            message,
            duration,
        ));
    }
    report.finish();
    Ok(report)
}

/// Maps a scenario result to an outcome and detail message.
fn classify(result: Result<(), ScenarioError>) -> (ScenarioOutcome, Option<String>) {
    match result {
        Ok(()) => (ScenarioOutcome::Pass, None),
        Err(ScenarioError::Skipped(reason)) => (ScenarioOutcome::Skip, Some(reason)),
        Err(err) => (ScenarioOutcome::Fail, Some(err.to_string())),
    }
}
