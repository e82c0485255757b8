// crates/conformance-harness/src/client/tests.rs
// ============================================================================
// Module: Scoped Client Tests
// Description: Unit coverage for URL rewriting, header defaults and responses.
// Purpose: Keep credential injection and per-call overrides predictable.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! Unit coverage for URL rewriting, header defaults and response helpers.

#![allow(
    clippy::expect_used,
    clippy::panic,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde_json::json;

use super::ClientError;
use super::RequestOptions;
use super::ScopedClient;
use super::ScopedResponse;
use super::resolve_url;
use crate::audit::NoopAuditSink;
use crate::identity::BearerToken;
use crate::target::TargetAddress;

fn client(base: &str) -> ScopedClient {
    let http = ScopedClient::build_http(Duration::from_secs(2)).expect("http client");
    ScopedClient::new(TargetAddress::new(base), http, Arc::new(NoopAuditSink))
}

#[test]
fn query_pairs_are_encoded_onto_the_joined_url() {
    let target = TargetAddress::new("http://localhost:8000");
    let url = resolve_url(
        &target,
        "/api/tasks",
        &[("status".to_string(), "in progress".to_string())],
    )
    .expect("url");
    assert_eq!(url, "http://localhost:8000/api/tasks?status=in+progress");
}

#[test]
fn urls_without_query_are_joined_verbatim() {
    let target = TargetAddress::new("http://localhost:8000/");
    let url = resolve_url(&target, "/api/tasks?status=done", &[]).expect("url");
    assert_eq!(url, "http://localhost:8000/api/tasks?status=done");
}

#[test]
fn anonymous_requests_carry_no_credential() {
    let headers = client("http://localhost:8000").build_headers(&RequestOptions::new()).unwrap();
    assert!(headers.get(AUTHORIZATION).is_none());
    assert!(headers.get(CONTENT_TYPE).is_none());

    let with_body = client("http://localhost:8000")
        .build_headers(&RequestOptions::new().json(json!({"title": "x"})))
        .unwrap();
    assert_eq!(with_body.get(CONTENT_TYPE).unwrap(), "application/json");
}

#[test]
fn authenticated_requests_carry_bearer_and_json_defaults() {
    let scoped = client("http://localhost:8000").with_bearer(BearerToken::new("abc123"));
    assert!(scoped.is_authenticated());
    let headers = scoped.build_headers(&RequestOptions::new()).unwrap();
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
}

#[test]
fn per_call_headers_replace_defaults() {
    let scoped = client("http://localhost:8000").with_bearer(BearerToken::new("abc123"));
    let options = RequestOptions::new()
        .header("Authorization", "Bearer other")
        .header("Content-Type", "text/plain");
    let headers = scoped.build_headers(&options).unwrap();
    assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer other");
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
}

#[test]
fn invalid_header_names_are_rejected() {
    let err = client("http://localhost:8000")
        .build_headers(&RequestOptions::new().header("bad header", "x"))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidHeader { .. }));
}

#[test]
fn unreachable_targets_surface_as_transport_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}")).get("/").unwrap_err();
    match err {
        ClientError::Transport {
            method,
            url,
            ..
        } => {
            assert_eq!(method, "GET");
            assert_eq!(url, format!("http://{addr}/"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn response_helpers_expose_body_views() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let response = ScopedResponse::from_parts(
        201,
        headers,
        Duration::from_millis(5),
        br#"{"id": 7, "title": "x"}"#.to_vec(),
    );
    assert_eq!(response.status(), 201);
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(response.json().unwrap()["id"], 7);
    assert_eq!(response.elapsed(), Duration::from_millis(5));
}

#[test]
fn excerpts_are_single_line_and_bounded() {
    let body = format!("line one\nline two {}", "x".repeat(500));
    let response =
        ScopedResponse::from_parts(500, HeaderMap::new(), Duration::ZERO, body.into_bytes());
    let excerpt = response.excerpt();
    assert!(!excerpt.contains('\n'));
    assert!(excerpt.ends_with("..."));
    assert_eq!(excerpt.chars().count(), 243);
}

#[test]
fn timeout_classification() {
    let err = ClientError::Transport {
        method: "GET".to_string(),
        url: "http://localhost:8000/".to_string(),
        message: "operation timed out".to_string(),
        timed_out: true,
    };
    assert!(err.is_timeout());
    assert!(!ClientError::Build("x".to_string()).is_timeout());
}
