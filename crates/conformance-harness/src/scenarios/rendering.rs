// crates/conformance-harness/src/scenarios/rendering.rs
// ============================================================================
// Module: Static Rendering Scenarios
// Description: Checks for a server-rendered "today is" HTML page.
// Purpose: Verify status, content type, content, structure and latency.
// Dependencies: time
// ============================================================================

//! ## Overview
//! The day-of-week check reads the wall clock at check time. A run that
//! straddles midnight can observe a different day than the target rendered.

use std::time::Duration;

use reqwest::Method;
use time::OffsetDateTime;

use super::Scenario;
use super::ScenarioContext;
use super::ScenarioError;
use super::ScenarioGroup;
use super::expect;
use crate::client::RequestOptions;
use crate::client::ScopedResponse;

/// Route that should not exist on the target.
const UNKNOWN_ROUTE: &str = "/nonexistent-route-12345";
/// Latency ceiling for the index page.
const RESPONSE_BUDGET: Duration = Duration::from_secs(2);
/// Markers accepted as evidence of styling, matched case-insensitively.
const STYLE_MARKERS: [&str; 6] =
    ["<style", "style=", "rel=\"stylesheet\"", "rel='stylesheet'", "rel=stylesheet", ".css"];

/// Rendering scenarios in execution order.
pub(super) const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "index_responds",
        group: ScenarioGroup::Rendering,
        description: "GET / answers 200",
        extension: false,
        run: index_responds,
    },
    Scenario {
        name: "index_is_html",
        group: ScenarioGroup::Rendering,
        description: "GET / is served as text/html",
        extension: false,
        run: index_is_html,
    },
    Scenario {
        name: "index_shows_today",
        group: ScenarioGroup::Rendering,
        description: "GET / mentions today and the current weekday name",
        extension: false,
        run: index_shows_today,
    },
    Scenario {
        name: "index_has_styling",
        group: ScenarioGroup::Rendering,
        description: "GET / carries inline styles, a style block or a stylesheet",
        extension: false,
        run: index_has_styling,
    },
    Scenario {
        name: "index_has_document_structure",
        group: ScenarioGroup::Rendering,
        description: "GET / has an html tag or doctype and a body tag",
        extension: false,
        run: index_has_document_structure,
    },
    Scenario {
        name: "unknown_route_not_found",
        group: ScenarioGroup::Rendering,
        description: "an unknown route answers 404",
        extension: false,
        run: unknown_route_not_found,
    },
    Scenario {
        name: "index_answers_head",
        group: ScenarioGroup::Rendering,
        description: "HEAD / answers 200",
        extension: false,
        run: index_answers_head,
    },
    Scenario {
        name: "index_responds_quickly",
        group: ScenarioGroup::Rendering,
        description: "GET / answers 200 within two seconds",
        extension: false,
        run: index_responds_quickly,
    },
];

/// English name of the current weekday, local time when available.
#[must_use]
pub fn current_day_name() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.weekday().to_string()
}

/// Fetches the index page and requires 200.
fn fetch_index(ctx: &ScenarioContext<'_>, check: &'static str) -> Result<ScopedResponse, ScenarioError> {
    let response = ctx.anonymous().get("/")?;
    expect::status(&response, check, &[200])?;
    Ok(response)
}

/// Requests the index.
fn index_responds(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    fetch_index(ctx, "index").map(|_| ())
}

/// Checks the content type.
fn index_is_html(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = fetch_index(ctx, "index content type")?;
    let content_type = response.content_type().unwrap_or_default();
    expect::ensure(
        content_type.to_ascii_lowercase().contains("text/html"),
        "index content type",
        || format!("expected text/html, got `{content_type}`"),
    )
}

/// Checks the page names today's weekday.
fn index_shows_today(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = fetch_index(ctx, "index content")?;
    let text = response.text();
    expect::ensure(text.to_lowercase().contains("today"), "index content", || {
        format!("expected the word `today`; body: {}", response.excerpt())
    })?;
    let day = current_day_name();
    expect::ensure(text.contains(&day), "index content", || {
        format!("expected the current day `{day}`; body: {}", response.excerpt())
    })
}

/// Checks for any styling marker.
fn index_has_styling(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = fetch_index(ctx, "index styling")?;
    expect::ensure(has_styling(&response.text()), "index styling", || {
        format!("expected a style block, inline style or stylesheet; body: {}", response.excerpt())
    })
}

/// True when `html` carries any styling marker.
pub(super) fn has_styling(html: &str) -> bool {
    let html = html.to_lowercase();
    STYLE_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Checks for minimal document structure.
fn index_has_document_structure(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = fetch_index(ctx, "index structure")?;
    let html = response.text().to_lowercase();
    expect::ensure(html.contains("<html") || html.contains("<!doctype html"), "index structure", || {
        format!("expected an html tag or doctype; body: {}", response.excerpt())
    })?;
    expect::ensure(html.contains("<body"), "index structure", || {
        format!("expected a body tag; body: {}", response.excerpt())
    })
}

/// Requests a route that should not exist.
fn unknown_route_not_found(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = ctx.anonymous().get(UNKNOWN_ROUTE)?;
    expect::status(&response, "unknown route", &[404])
}

/// Issues HEAD on the index.
fn index_answers_head(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = ctx.anonymous().head("/")?;
    expect::status(&response, "index HEAD", &[200])
}

/// Times the index under a two-second per-request timeout.
fn index_responds_quickly(ctx: &ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let options = RequestOptions::new().timeout(RESPONSE_BUDGET);
    let response = ctx.anonymous().send(Method::GET, "/", options)?;
    expect::status(&response, "index latency", &[200])?;
    let elapsed = response.elapsed();
    expect::ensure(elapsed < RESPONSE_BUDGET, "index latency", || {
        format!("expected under {} ms, took {} ms", RESPONSE_BUDGET.as_millis(), elapsed.as_millis())
    })
}
