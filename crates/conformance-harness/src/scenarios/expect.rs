// crates/conformance-harness/src/scenarios/expect.rs
// ============================================================================
// Module: Scenario Assertions
// Description: Status, JSON body and field assertions for scenarios.
// Purpose: Produce failure messages naming expected versus observed values.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Every helper returns a [`ScenarioError`] whose message quotes what was
//! expected and what the target actually sent, including a body excerpt.

use serde_json::Map;
use serde_json::Value;

use super::ScenarioError;
use crate::client::ScopedResponse;

/// Keys under which a list endpoint may nest its items.
const LIST_KEYS: [&str; 3] = ["tasks", "data", "items"];

/// Requires the response status to be one of `allowed`.
pub(super) fn status(
    response: &ScopedResponse,
    check: &'static str,
    allowed: &[u16],
) -> Result<(), ScenarioError> {
    if allowed.contains(&response.status()) {
        return Ok(());
    }
    Err(ScenarioError::UnexpectedStatus {
        check,
        expected: describe_statuses(allowed),
        status: response.status(),
        body: response.excerpt(),
    })
}

/// Requires any 2xx status.
pub(super) fn success(response: &ScopedResponse, check: &'static str) -> Result<(), ScenarioError> {
    if (200..=299).contains(&response.status()) {
        return Ok(());
    }
    Err(ScenarioError::UnexpectedStatus {
        check,
        expected: "2xx".to_string(),
        status: response.status(),
        body: response.excerpt(),
    })
}

/// Fails with `detail` unless `condition` holds.
pub(super) fn ensure(
    condition: bool,
    check: &'static str,
    detail: impl FnOnce() -> String,
) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Assertion {
            check,
            detail: detail(),
        })
    }
}

/// Parses the body as a JSON object.
pub(super) fn object(
    response: &ScopedResponse,
    check: &'static str,
) -> Result<Map<String, Value>, ScenarioError> {
    match response.json() {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(ScenarioError::Assertion {
            check,
            detail: format!("expected a JSON object, got: {}", response.excerpt()),
        }),
    }
}

/// Returns a present, non-null field.
pub(super) fn field<'m>(
    body: &'m Map<String, Value>,
    name: &str,
    check: &'static str,
) -> Result<&'m Value, ScenarioError> {
    match body.get(name) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(ScenarioError::Assertion {
            check,
            detail: format!("expected field `{name}` in {}", Value::Object(body.clone())),
        }),
    }
}

/// Requires `body[name] == expected`.
pub(super) fn field_eq(
    body: &Map<String, Value>,
    name: &str,
    expected: &Value,
    check: &'static str,
) -> Result<(), ScenarioError> {
    let actual = body.get(name).unwrap_or(&Value::Null);
    ensure(actual == expected, check, || format!("expected `{name}` = {expected}, got {actual}"))
}

/// Requires every field of `payload` to be echoed unchanged in `body`.
pub(super) fn echoes(
    body: &Map<String, Value>,
    payload: &Value,
    check: &'static str,
) -> Result<(), ScenarioError> {
    if let Value::Object(fields) = payload {
        for (name, expected) in fields {
            field_eq(body, name, expected, check)?;
        }
    }
    Ok(())
}

/// Locates the item list in a list response.
///
/// The body may be the array itself or an object nesting it under `tasks`,
/// `data` or `items`.
pub(super) fn item_list(body: &Value) -> Option<&Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(map) => LIST_KEYS.iter().find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

/// Renders an accepted-status set as `200`, `400 or 409`, `200, 201 or 204`.
pub(super) fn describe_statuses(allowed: &[u16]) -> String {
    match allowed {
        [] => "none".to_string(),
        [only] => only.to_string(),
        [head @ .., last] => {
            let head: Vec<String> = head.iter().map(u16::to_string).collect();
            format!("{} or {last}", head.join(", "))
        }
    }
}
