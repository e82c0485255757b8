// crates/conformance-harness/src/scenarios/isolation.rs
// ============================================================================
// Module: Ownership Isolation Scenarios
// Description: Cross-identity access checks.
// Purpose: Verify a task is invisible to identities that did not create it.
// Dependencies: serde_json
// ============================================================================

//! Cross-identity ownership checks.

use serde_json::json;

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;
use super::tasks::create_task;
use super::tasks::task_path;
use crate::identity::UserRef;
use crate::identity::random_suffix;

/// Password for the second identity, distinct from the session identity's.
const OTHER_PASSWORD: &str = "OtherPassword123!";

/// Isolation scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[Scenario {
    name: "task_hidden_from_other_identity",
    group: ScenarioGroup::Isolation,
    description: "another identity reading a task answers 403 or 404, never 200",
    extension: false,
    run: task_hidden_from_other_identity,
}];

/// Creates a task as the session identity and reads it as a second one.
fn task_hidden_from_other_identity(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let owner = ctx.authenticated()?;
    let payload = json!({
        "title": format!("Private Task {}", random_suffix()),
        "description": "This task should be private",
    });
    let (id, _) = create_task(&owner, payload, "create private task")?;

    let username = format!("otheruser_{}", random_suffix());
    let email = format!("{username}@example.com");
    let other = ctx.provisioner().provision_user(UserRef::new(username, email, OTHER_PASSWORD))?;
    let response = ctx.session().client_for(&other).get(&task_path(&id))?;
    expect::ensure(response.status() != 200, "read as other identity", || {
        format!("another identity read the task; body: {}", response.excerpt())
    })?;
    expect::status(&response, "read as other identity", &[403, 404])
}
