// crates/conformance-harness/src/client.rs
// ============================================================================
// Module: Scoped HTTP Client
// Description: Target-relative HTTP client with optional bearer credential.
// Purpose: Rewrite relative paths against the target and inject auth headers.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`ScopedClient`] decorates a blocking `reqwest` client. Relative paths are
//! joined onto the run's [`TargetAddress`]; authenticated clients add an
//! `Authorization: Bearer` header and a JSON content type to every request.
//! Per-call headers replace those defaults. No retries are attempted and the
//! only timeouts are the client default and any per-call override.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::audit::AuditSink;
use crate::audit::RequestAuditEvent;
use crate::identity::BearerToken;
use crate::target::TargetAddress;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// User agent sent with every request.
const USER_AGENT: &str = concat!("conformance-harness/", env!("CARGO_PKG_VERSION"));
/// Maximum characters of a body quoted in failure messages.
const EXCERPT_CHARS: usize = 240;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Build(String),
    /// The resolved URL is not a valid absolute URL.
    #[error("invalid request url {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser detail.
        message: String,
    },
    /// A per-call header could not be encoded.
    #[error("invalid header {name}: {message}")]
    InvalidHeader {
        /// Header name as supplied.
        name: String,
        /// Encoding detail.
        message: String,
    },
    /// The JSON body could not be serialized.
    #[error("failed to encode request body for {url}: {message}")]
    Encode {
        /// Request URL.
        url: String,
        /// Serializer detail.
        message: String,
    },
    /// No response was received (connection refused, DNS, timeout, reset).
    #[error("{method} {url} failed: {message}")]
    Transport {
        /// HTTP method.
        method: String,
        /// Request URL.
        url: String,
        /// Transport detail including the error chain.
        message: String,
        /// Whether the failure was a timeout.
        timed_out: bool,
    },
}

impl ClientError {
    /// Returns true when the request exceeded its timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                timed_out: true,
                ..
            }
        )
    }
}

// ============================================================================
// SECTION: Request Options
// ============================================================================

/// Per-call request customization.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// JSON body, if any.
    body: Option<Value>,
    /// Header overrides applied after client defaults.
    headers: Vec<(String, String)>,
    /// Query pairs appended to the URL.
    query: Vec<(String, String)>,
    /// Timeout overriding the client default.
    timeout: Option<Duration>,
}

impl RequestOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing any client default of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a query pair.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Overrides the timeout for this call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct ScopedResponse {
    /// Status code.
    status: u16,
    /// Response headers.
    headers: HeaderMap,
    /// Time until the response head arrived.
    elapsed: Duration,
    /// Raw body bytes.
    body: Vec<u8>,
}

impl ScopedResponse {
    /// Assembles a response from its parts.
    #[must_use]
    pub const fn from_parts(
        status: u16,
        headers: HeaderMap,
        elapsed: Duration,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            headers,
            elapsed,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the time until the response head arrived.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parses the body as JSON, returning `None` when it is not JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Returns a header value when present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Returns a bounded, single-line body excerpt for diagnostics.
    #[must_use]
    pub fn excerpt(&self) -> String {
        let text = self.text();
        let flattened: String =
            text.chars().map(|ch| if ch.is_control() { ' ' } else { ch }).collect();
        let trimmed = flattened.trim();
        if trimmed.chars().count() <= EXCERPT_CHARS {
            return trimmed.to_string();
        }
        let mut cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client scoped to one target and, optionally, one credential.
#[derive(Clone)]
pub struct ScopedClient {
    /// Base address for relative paths.
    target: TargetAddress,
    /// Shared blocking client (connection pool).
    http: Client,
    /// Bearer token injected on every request when present.
    bearer: Option<BearerToken>,
    /// Request audit sink.
    audit: Arc<dyn AuditSink>,
}

impl ScopedClient {
    /// Builds the shared blocking client with a default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when the TLS backend or client
    /// configuration cannot be initialized.
    pub fn build_http(timeout: Duration) -> Result<Client, ClientError> {
        Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ClientError::Build(error_chain(&err)))
    }

    /// Creates an unauthenticated client for `target`.
    #[must_use]
    pub fn new(target: TargetAddress, http: Client, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            target,
            http,
            bearer: None,
            audit,
        }
    }

    /// Returns a copy of this client that authenticates with `token`.
    #[must_use]
    pub fn with_bearer(mut self, token: BearerToken) -> Self {
        self.bearer = Some(token);
        self
    }

    /// Returns true when requests carry a bearer credential by default.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    /// Returns the base address.
    #[must_use]
    pub const fn target(&self) -> &TargetAddress {
        &self.target
    }

    /// Issues `GET path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response is received.
    pub fn get(&self, path: &str) -> Result<ScopedResponse, ClientError> {
        self.send(Method::GET, path, RequestOptions::new())
    }

    /// Issues `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response is received.
    pub fn post(&self, path: &str, body: Value) -> Result<ScopedResponse, ClientError> {
        self.send(Method::POST, path, RequestOptions::new().json(body))
    }

    /// Issues `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response is received.
    pub fn put(&self, path: &str, body: Value) -> Result<ScopedResponse, ClientError> {
        self.send(Method::PUT, path, RequestOptions::new().json(body))
    }

    /// Issues `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response is received.
    pub fn patch(&self, path: &str, body: Value) -> Result<ScopedResponse, ClientError> {
        self.send(Method::PATCH, path, RequestOptions::new().json(body))
    }

    /// Issues `DELETE path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response is received.
    pub fn delete(&self, path: &str) -> Result<ScopedResponse, ClientError> {
        self.send(Method::DELETE, path, RequestOptions::new())
    }

    /// Issues `HEAD path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response is received.
    pub fn head(&self, path: &str) -> Result<ScopedResponse, ClientError> {
        self.send(Method::HEAD, path, RequestOptions::new())
    }

    /// Issues a request with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request cannot be encoded or no
    /// response is received.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ScopedResponse, ClientError> {
        let url = resolve_url(&self.target, path, &options.query)?;
        let headers = self.build_headers(&options)?;
        let authenticated = headers.contains_key(AUTHORIZATION);

        let mut builder = self.http.request(method.clone(), url.as_str()).headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body).map_err(|err| ClientError::Encode {
                url: url.clone(),
                message: err.to_string(),
            })?;
            builder = builder.body(bytes);
        }

        let started = Instant::now();
        let outcome = builder.send().and_then(|response| {
            let elapsed = started.elapsed();
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes()?.to_vec();
            Ok(ScopedResponse::from_parts(status, headers, elapsed, body))
        });

        match outcome {
            Ok(response) => {
                self.audit.record_request(&RequestAuditEvent::new(
                    method.as_str(),
                    &url,
                    authenticated,
                    Ok(response.status()),
                    response.elapsed(),
                ));
                Ok(response)
            }
            Err(err) => {
                let message = error_chain(&err);
                self.audit.record_request(&RequestAuditEvent::new(
                    method.as_str(),
                    &url,
                    authenticated,
                    Err(message.clone()),
                    started.elapsed(),
                ));
                Err(ClientError::Transport {
                    method: method.to_string(),
                    url,
                    message,
                    timed_out: err.is_timeout(),
                })
            }
        }
    }

    /// Merges client defaults with per-call header overrides.
    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose())).map_err(
                |err| ClientError::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                    message: err.to_string(),
                },
            )?;
            headers.insert(AUTHORIZATION, value);
        }
        if self.bearer.is_some() || options.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &options.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|err| ClientError::InvalidHeader {
                    name: name.clone(),
                    message: err.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| ClientError::InvalidHeader {
                    name: name.clone(),
                    message: err.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins `path` onto the target and appends query pairs.
fn resolve_url(
    target: &TargetAddress,
    path: &str,
    query: &[(String, String)],
) -> Result<String, ClientError> {
    let joined = target.join(path);
    if query.is_empty() {
        return Ok(joined);
    }
    let mut url = Url::parse(&joined).map_err(|err| ClientError::InvalidUrl {
        url: joined.clone(),
        message: err.to_string(),
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }
    Ok(url.to_string())
}

/// Renders an error with its source chain on one line.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
