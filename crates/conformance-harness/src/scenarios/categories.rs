// crates/conformance-harness/src/scenarios/categories.rs
// ============================================================================
// Module: Category Scenarios
// Description: Opt-in checks for the category (or tag) resource.
// Purpose: Verify labels can be created, listed and deleted.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Targets expose labels as `/api/categories` or, failing that, `/api/tags`.
//! The collection is chosen per check by the create call: a 404 from
//! categories retries the same payload against tags, and every later request
//! in that check uses whichever collection answered.

use serde_json::Value;
use serde_json::json;

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;
use super::tasks::item_path;
use crate::client::ScopedClient;
use crate::identity::random_suffix;

/// Preferred label collection.
pub(super) const CATEGORIES_PATH: &str = "/api/categories";
/// Fallback label collection.
pub(super) const TAGS_PATH: &str = "/api/tags";

/// Category scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "create_category",
        group: ScenarioGroup::Categories,
        description: "creating a category (or tag on 404) answers 200 or 201 with an id",
        extension: true,
        run: create_category,
    },
    Scenario {
        name: "list_categories",
        group: ScenarioGroup::Categories,
        description: "listing the label collection answers 200",
        extension: true,
        run: list_categories,
    },
    Scenario {
        name: "delete_category",
        group: ScenarioGroup::Categories,
        description: "deleting a label answers 200 or 204",
        extension: true,
        run: delete_category,
    },
];

/// Label created by a check, with the collection that accepted it.
struct CreatedLabel {
    /// Collection path that answered the create.
    collection: &'static str,
    /// Label id as rendered by the target.
    id: Value,
}

/// Creates a label, falling back to tags when categories answers 404.
fn new_label(client: &ScopedClient, check: &'static str) -> Result<CreatedLabel, ScenarioError> {
    let payload = json!({ "name": format!("Test Category {}", random_suffix()) });
    let mut collection = CATEGORIES_PATH;
    let mut response = client.post(collection, payload.clone())?;
    if response.status() == 404 {
        collection = TAGS_PATH;
        response = client.post(collection, payload)?;
    }
    expect::status(&response, check, &[200, 201])?;
    let body = expect::object(&response, check)?;
    let id = expect::field(&body, "id", check)?.clone();
    Ok(CreatedLabel {
        collection,
        id,
    })
}

/// Creates a label.
fn create_category(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    new_label(&ctx.authenticated()?, "create category").map(|_| ())
}

/// Creates a label then lists its collection.
fn list_categories(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let client = ctx.authenticated()?;
    let label = new_label(&client, "create category for list")?;
    let response = client.get(label.collection)?;
    expect::status(&response, "list categories", &[200])
}

/// Creates then deletes a label.
fn delete_category(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let client = ctx.authenticated()?;
    let label = new_label(&client, "create category for delete")?;
    let response = client.delete(&item_path(label.collection, &label.id))?;
    expect::status(&response, "delete category", &[200, 204])
}
