// crates/conformance-harness/src/scenarios/projects.rs
// ============================================================================
// Module: Project Scenarios
// Description: Opt-in checks for the project resource and task grouping.
// Purpose: Verify project CRUD and that tasks can be filed under a project.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Projects are an optional resource under `/api/projects`. Each check
//! creates the project it needs, so a missing endpoint fails every check
//! with the observed 404 rather than cascading from a shared fixture.

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;
use super::tasks::create_task;
use super::tasks::item_path;
use crate::client::ScopedClient;
use crate::identity::random_suffix;

/// Project collection endpoint.
const PROJECTS_PATH: &str = "/api/projects";

/// Project scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "create_project",
        group: ScenarioGroup::Projects,
        description: "creating a project answers 200 or 201 with an id",
        extension: true,
        run: create_project,
    },
    Scenario {
        name: "list_projects",
        group: ScenarioGroup::Projects,
        description: "listing projects answers 200 with a JSON collection",
        extension: true,
        run: list_projects,
    },
    Scenario {
        name: "get_project_by_id",
        group: ScenarioGroup::Projects,
        description: "a created project reads back by id with its name",
        extension: true,
        run: get_project_by_id,
    },
    Scenario {
        name: "create_task_in_project",
        group: ScenarioGroup::Projects,
        description: "a task created with project_id references that project",
        extension: true,
        run: create_task_in_project,
    },
    Scenario {
        name: "delete_project",
        group: ScenarioGroup::Projects,
        description: "deleting a project answers 200 or 204",
        extension: true,
        run: delete_project,
    },
];

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates a project, requiring 200/201 and an id. Returns the id and body.
fn new_project(
    client: &ScopedClient,
    check: &'static str,
) -> Result<(Value, Map<String, Value>), ScenarioError> {
    let payload = json!({
        "name": format!("Test Project {}", random_suffix()),
        "description": "A test project",
    });
    let response = client.post(PROJECTS_PATH, payload.clone())?;
    expect::status(&response, check, &[200, 201])?;
    let body = expect::object(&response, check)?;
    let id = expect::field(&body, "id", check)?.clone();
    expect::field_eq(&body, "name", &payload["name"], check)?;
    Ok((id, body))
}

/// True when `task` names `project_id` directly or through a nested project.
fn references_project(task: &Map<String, Value>, project_id: &Value) -> bool {
    task.get("project_id") == Some(project_id)
        || task.get("project").and_then(|project| project.get("id")) == Some(project_id)
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Creates a project.
fn create_project(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    new_project(&ctx.authenticated()?, "create project").map(|_| ())
}

/// Creates a project then lists.
fn list_projects(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let client = ctx.authenticated()?;
    new_project(&client, "create project for list")?;
    let response = client.get(PROJECTS_PATH)?;
    expect::status(&response, "list projects", &[200])?;
    let collection = matches!(response.json(), Some(Value::Array(_) | Value::Object(_)));
    expect::ensure(collection, "list projects", || {
        format!("expected a JSON array or object, got: {}", response.excerpt())
    })
}

/// Creates a project and reads it back.
fn get_project_by_id(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let client = ctx.authenticated()?;
    let (id, created) = new_project(&client, "create project for get")?;
    let response = client.get(&item_path(PROJECTS_PATH, &id))?;
    expect::status(&response, "get project", &[200])?;
    let body = expect::object(&response, "get project")?;
    expect::field_eq(&body, "id", &id, "get project")?;
    let name = created.get("name").cloned().unwrap_or(Value::Null);
    expect::field_eq(&body, "name", &name, "get project")
}

/// Files a new task under a new project.
fn create_task_in_project(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let client = ctx.authenticated()?;
    let (project_id, _) = new_project(&client, "create project for task")?;
    let payload = json!({
        "title": format!("Project Task {}", random_suffix()),
        "project_id": project_id,
    });
    let (_, task) = create_task(&client, payload, "create task in project")?;
    expect::ensure(references_project(&task, &project_id), "create task in project", || {
        format!(
            "expected `project_id` or `project.id` = {project_id}, got {}",
            Value::Object(task.clone())
        )
    })
}

/// Creates then deletes a project.
fn delete_project(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let client = ctx.authenticated()?;
    let (id, _) = new_project(&client, "create project for delete")?;
    let response = client.delete(&item_path(PROJECTS_PATH, &id))?;
    expect::status(&response, "delete project", &[200, 204])
}
