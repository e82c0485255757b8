// crates/conformance-harness/src/scenarios/validation.rs
// ============================================================================
// Module: Input Validation Scenarios
// Description: Opt-in checks for rejected registration and task inputs.
// Purpose: Verify the target validates passwords, emails and titles.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Opt-in checks. Each payload differs from a valid one in exactly one
//! field, and the target must answer exactly 400.

use serde_json::json;

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;
use super::tasks::TASKS_PATH;
use crate::identity::DEFAULT_PASSWORD;
use crate::identity::UserRef;
use crate::identity::random_suffix;

/// Validation scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "weak_password_rejected",
        group: ScenarioGroup::Validation,
        description: "registering with password `123` answers 400",
        extension: true,
        run: weak_password_rejected,
    },
    Scenario {
        name: "invalid_email_rejected",
        group: ScenarioGroup::Validation,
        description: "registering with a malformed email answers 400",
        extension: true,
        run: invalid_email_rejected,
    },
    Scenario {
        name: "empty_title_rejected",
        group: ScenarioGroup::Validation,
        description: "creating a task with an empty title answers 400",
        extension: true,
        run: empty_title_rejected,
    },
];

/// Registers with a three-character password.
fn weak_password_rejected(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let username = format!("weakpwd_{}", random_suffix());
    let email = format!("{username}@example.com");
    let response = ctx.provisioner().register(&UserRef::new(username, email, "123"))?;
    expect::status(&response, "register with weak password", &[400])
}

/// Registers with an email lacking `@`.
fn invalid_email_rejected(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let username = format!("bademail_{}", random_suffix());
    let response =
        ctx.provisioner().register(&UserRef::new(username, "not-an-email", DEFAULT_PASSWORD))?;
    expect::status(&response, "register with invalid email", &[400])
}

/// Creates a task whose title is the empty string.
fn empty_title_rejected(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let payload = json!({
        "title": "",
        "description": "Empty title",
    });
    let response = ctx.authenticated()?.post(TASKS_PATH, payload)?;
    expect::status(&response, "create task with empty title", &[400])
}
