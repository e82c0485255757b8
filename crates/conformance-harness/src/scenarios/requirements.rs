// crates/conformance-harness/src/scenarios/requirements.rs
// ============================================================================
// Module: Deployment Requirement Scenarios
// Description: Opt-in checks on how the target is deployed.
// Purpose: Verify the target listens on the documented port.
// Dependencies: std
// ============================================================================

//! Port requirement for the day server suite.

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;

/// Port the target is documented to listen on.
const REQUIRED_PORT: u16 = 8000;

/// Requirement scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[Scenario {
    name: "target_uses_port_8000",
    group: ScenarioGroup::Requirements,
    description: "the target listens on port 8000 and its base address answers 200",
    extension: true,
    run: target_uses_port_8000,
}];

/// Checks the resolved port, then the bare base address.
fn target_uses_port_8000(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let target = ctx.target();
    let port = target.port();
    expect::ensure(port == Some(REQUIRED_PORT), "target port", || match port {
        Some(port) => format!("expected port {REQUIRED_PORT}, target {target} uses {port}"),
        None => format!("expected port {REQUIRED_PORT}, target {target} has no port"),
    })?;
    let response = ctx.anonymous().get("")?;
    expect::status(&response, "target base address", &[200])
}
