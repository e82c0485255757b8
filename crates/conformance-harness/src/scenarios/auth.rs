// crates/conformance-harness/src/scenarios/auth.rs
// ============================================================================
// Module: Authentication Scenarios
// Description: Registration, login and bearer enforcement checks.
// Purpose: Verify the auth endpoints and the protected-route gate.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! Registration and login checks provision fresh identities. Only the
//! protected-route check uses the session credential.

use reqwest::Method;
use reqwest::header::AUTHORIZATION;

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;
use super::tasks::TASKS_PATH;
use crate::client::RequestOptions;
use crate::identity::UserRef;
use crate::identity::extract_token;

/// Authentication scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "register_new_identity",
        group: ScenarioGroup::Auth,
        description: "registering a novel identity answers 2xx with a JSON body",
        extension: false,
        run: register_new_identity,
    },
    Scenario {
        name: "login_returns_token",
        group: ScenarioGroup::Auth,
        description: "login answers 200 with a token, access_token or jwt",
        extension: false,
        run: login_returns_token,
    },
    Scenario {
        name: "invalid_credentials_rejected",
        group: ScenarioGroup::Auth,
        description: "login with unknown credentials answers 401 or 403",
        extension: false,
        run: invalid_credentials_rejected,
    },
    Scenario {
        name: "protected_route_requires_auth",
        group: ScenarioGroup::Auth,
        description: "the task list without a credential answers exactly 401",
        extension: false,
        run: protected_route_requires_auth,
    },
    Scenario {
        name: "protected_route_accepts_token",
        group: ScenarioGroup::Auth,
        description: "the task list with the session credential answers 200 or 404",
        extension: false,
        run: protected_route_accepts_token,
    },
    Scenario {
        name: "invalid_token_rejected",
        group: ScenarioGroup::Auth,
        description: "a well-formed but unknown bearer token answers 401",
        extension: false,
        run: invalid_token_rejected,
    },
    Scenario {
        name: "duplicate_username_rejected",
        group: ScenarioGroup::Auth,
        description: "registering the same username twice answers 400 or 409",
        extension: false,
        run: duplicate_username_rejected,
    },
];

/// Bearer token no target should ever have issued.
const BOGUS_TOKEN: &str = "invalid_token_12345";

/// Registers a fresh identity and expects a JSON body back.
fn register_new_identity(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let user = UserRef::generate("newuser");
    let response = ctx.provisioner().register(&user)?;
    expect::success(&response, "register")?;
    let body = response.json();
    expect::ensure(body.as_ref().is_some_and(|body| !body.is_null()), "register", || {
        format!("expected a JSON body, got: {}", response.excerpt())
    })
}

/// Registers then logs in and expects a usable token.
fn login_returns_token(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let provisioner = ctx.provisioner();
    let user = UserRef::generate("loginuser");
    provisioner.register(&user)?;
    let response = provisioner.login_response(&user)?;
    expect::status(&response, "login", &[200])?;
    extract_token(&response).map_err(|err| ScenarioError::Assertion {
        check: "login",
        detail: err.to_string(),
    })?;
    Ok(())
}

/// Logs in as an identity that was never registered.
fn invalid_credentials_rejected(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let user = UserRef::new(
        "nonexistent_user",
        "nonexistent_user@example.com",
        "WrongPassword123!",
    );
    let response = ctx.provisioner().login_response(&user)?;
    expect::status(&response, "login with bad credentials", &[401, 403])
}

/// Lists tasks without any credential.
fn protected_route_requires_auth(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = ctx.anonymous().get(TASKS_PATH)?;
    expect::status(&response, "anonymous task list", &[401])
}

/// Lists tasks with the session credential.
fn protected_route_accepts_token(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = ctx.authenticated()?.get(TASKS_PATH)?;
    expect::ensure(response.status() != 401, "authenticated task list", || {
        format!("valid token was rejected with 401; body: {}", response.excerpt())
    })?;
    expect::status(&response, "authenticated task list", &[200, 404])
}

/// Lists tasks with a bearer token the target never issued.
fn invalid_token_rejected(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let options =
        RequestOptions::new().header(AUTHORIZATION.as_str(), format!("Bearer {BOGUS_TOKEN}"));
    let response = ctx.anonymous().send(Method::GET, TASKS_PATH, options)?;
    expect::status(&response, "task list with unknown token", &[401])
}

/// Registers the same identity twice.
fn duplicate_username_rejected(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let provisioner = ctx.provisioner();
    let user = UserRef::generate("duplicate");
    let first = provisioner.register(&user)?;
    expect::status(&first, "first registration", &[200, 201])?;
    let second = provisioner.register(&user)?;
    expect::status(&second, "second registration", &[400, 409])
}
