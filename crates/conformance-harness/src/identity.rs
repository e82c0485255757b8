// crates/conformance-harness/src/identity.rs
// ============================================================================
// Module: Identity Provisioning
// Description: Register-then-login protocol producing a bearer credential.
// Purpose: Obtain one authenticated identity per session and cache it.
// Dependencies: rand, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`Provisioner`] creates a synthetic [`UserRef`], registers it against the
//! target and logs in to obtain a bearer token. A `409 Conflict` on
//! registration is treated as "already exists" and the protocol continues to
//! login; every other non-2xx registration status is fatal. The login body
//! may carry the token under `token`, `access_token` or `jwt`; any other
//! shape is a contract violation.
//!
//! [`CredentialCache`] holds the session credential in a single-assignment
//! cell so provisioning runs at most once even when callers race.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::audit::ProvisionAuditEvent;
use crate::client::ClientError;
use crate::client::ScopedClient;
use crate::client::ScopedResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registration endpoint.
pub const REGISTER_PATH: &str = "/api/auth/register";
/// Login endpoint.
pub const LOGIN_PATH: &str = "/api/auth/login";
/// Username prefix for the session identity.
pub const SESSION_USER_PREFIX: &str = "testuser";
/// Password assigned to every synthetic identity.
pub const DEFAULT_PASSWORD: &str = "TestPassword123!";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Opaque bearer token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for header construction.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Synthetic user identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Unique username.
    pub username: String,
    /// Email derived from the username.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl UserRef {
    /// Creates an identity from explicit parts.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Generates `{prefix}_{8 hex}` with a matching `@example.com` email.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let username = format!("{prefix}_{}", random_suffix());
        let email = format!("{username}@example.com");
        Self::new(username, email, DEFAULT_PASSWORD)
    }

    /// Returns the registration payload.
    #[must_use]
    pub fn registration_body(&self) -> Value {
        json!({
            "username": self.username,
            "email": self.email,
            "password": self.password,
        })
    }

    /// Returns the login payload.
    #[must_use]
    pub fn login_body(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password,
        })
    }
}

/// Key under which a login response carried its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    /// `{"token": ...}`
    Token,
    /// `{"access_token": ...}`
    AccessToken,
    /// `{"jwt": ...}`
    Jwt,
}

impl TokenShape {
    /// Probe order for token extraction.
    pub const PROBE_ORDER: [Self; 3] = [Self::Token, Self::AccessToken, Self::Jwt];

    /// Returns the JSON key for this shape.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::AccessToken => "access_token",
            Self::Jwt => "jwt",
        }
    }
}

/// Login response body covering every accepted token shape.
#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    /// Value under `token`.
    #[serde(default)]
    token: Option<Value>,
    /// Value under `access_token`.
    #[serde(default)]
    access_token: Option<Value>,
    /// Value under `jwt`.
    #[serde(default)]
    jwt: Option<Value>,
}

impl LoginBody {
    /// Reads the known keys from a JSON body; non-objects yield an empty body.
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        // Struct deserialization also accepts sequences by position.
        if !body.is_object() {
            return Self::default();
        }
        serde_json::from_value(body.clone()).unwrap_or_default()
    }

    /// Resolves the first non-empty string token in probe order.
    #[must_use]
    pub fn resolve(&self) -> Option<(TokenShape, BearerToken)> {
        TokenShape::PROBE_ORDER.into_iter().find_map(|shape| {
            let slot = match shape {
                TokenShape::Token => &self.token,
                TokenShape::AccessToken => &self.access_token,
                TokenShape::Jwt => &self.jwt,
            };
            slot.as_ref()
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(|token| (shape, BearerToken::new(token)))
        })
    }
}

/// Authenticated identity for a run.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Identity the token was issued to.
    pub identity: UserRef,
    /// Bearer token.
    pub token: BearerToken,
    /// Key the token was found under.
    pub shape: TokenShape,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provisioning failures.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// No response from the target during a protocol step.
    #[error("{stage} request failed: {source}")]
    Transport {
        /// Protocol step.
        stage: &'static str,
        /// Underlying client error.
        source: ClientError,
    },
    /// Registration returned neither 2xx nor 409.
    #[error("registration failed: status {status}, body: {body}")]
    Registration {
        /// Observed status.
        status: u16,
        /// Body excerpt.
        body: String,
    },
    /// Login did not return 200.
    #[error("login failed: status {status}, body: {body}")]
    Authentication {
        /// Observed status.
        status: u16,
        /// Body excerpt.
        body: String,
    },
    /// Login succeeded but carried no usable token.
    #[error("login response has no non-empty token, access_token or jwt: {body}")]
    MissingToken {
        /// Body excerpt.
        body: String,
    },
    /// A previous provisioning attempt panicked while holding the init guard.
    #[error("credential cache poisoned")]
    CachePoisoned,
}

impl IdentityError {
    /// Returns true when the target answered but violated the login contract.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MissingToken { .. })
    }
}

/// Extracts the token from a login response body.
///
/// # Errors
///
/// Returns [`IdentityError::MissingToken`] when no accepted key holds a
/// non-empty string.
pub fn extract_token(response: &ScopedResponse) -> Result<(TokenShape, BearerToken), IdentityError> {
    let body = response.json().unwrap_or(Value::Null);
    LoginBody::from_json(&body).resolve().ok_or_else(|| IdentityError::MissingToken {
        body: response.excerpt(),
    })
}

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Runs the register/login protocol against the target.
#[derive(Clone)]
pub struct Provisioner {
    /// Unauthenticated client for the auth endpoints.
    client: ScopedClient,
    /// Audit sink for protocol steps.
    audit: Arc<dyn AuditSink>,
}

impl Provisioner {
    /// Creates a provisioner over an unauthenticated client.
    #[must_use]
    pub fn new(client: ScopedClient, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            client,
            audit,
        }
    }

    /// Sends the registration request and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Transport`] when no response is received.
    pub fn register(&self, user: &UserRef) -> Result<ScopedResponse, IdentityError> {
        self.client.post(REGISTER_PATH, user.registration_body()).map_err(|source| {
            self.audit.record_provision(&ProvisionAuditEvent::new(
                &user.username,
                "register",
                None,
                "unreachable",
            ));
            IdentityError::Transport {
                stage: "register",
                source,
            }
        })
    }

    /// Sends the login request and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Transport`] when no response is received.
    pub fn login_response(&self, user: &UserRef) -> Result<ScopedResponse, IdentityError> {
        self.client.post(LOGIN_PATH, user.login_body()).map_err(|source| {
            self.audit.record_provision(&ProvisionAuditEvent::new(
                &user.username,
                "login",
                None,
                "unreachable",
            ));
            IdentityError::Transport {
                stage: "login",
                source,
            }
        })
    }

    /// Logs in and resolves the credential.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Authentication`] on a non-200 status and
    /// [`IdentityError::MissingToken`] when the body has no usable token.
    pub fn login(&self, user: &UserRef) -> Result<Credential, IdentityError> {
        let response = self.login_response(user)?;
        let status = response.status();
        if status != 200 {
            self.record(user, "login", Some(status), "rejected");
            return Err(IdentityError::Authentication {
                status,
                body: response.excerpt(),
            });
        }
        let (shape, token) = extract_token(&response).inspect_err(|_| {
            self.record(user, "login", Some(status), "missing_token");
        })?;
        self.record(user, "login", Some(status), "ok");
        Ok(Credential {
            identity: user.clone(),
            token,
            shape,
        })
    }

    /// Provisions a fresh session identity.
    ///
    /// # Errors
    ///
    /// See [`Provisioner::provision_user`].
    pub fn provision(&self) -> Result<Credential, IdentityError> {
        self.provision_user(UserRef::generate(SESSION_USER_PREFIX))
    }

    /// Registers `user` (tolerating 409) and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Registration`] when registration yields a
    /// status other than 2xx or 409; otherwise any error from
    /// [`Provisioner::login`].
    pub fn provision_user(&self, user: UserRef) -> Result<Credential, IdentityError> {
        let response = self.register(&user)?;
        let status = response.status();
        match status {
            200..=299 => self.record(&user, "register", Some(status), "created"),
            409 => self.record(&user, "register", Some(status), "conflict"),
            _ => {
                self.record(&user, "register", Some(status), "rejected");
                return Err(IdentityError::Registration {
                    status,
                    body: response.excerpt(),
                });
            }
        }
        self.login(&user)
    }

    /// Records one protocol step.
    fn record(&self, user: &UserRef, stage: &'static str, status: Option<u16>, outcome: &'static str) {
        self.audit.record_provision(&ProvisionAuditEvent::new(&user.username, stage, status, outcome));
    }
}

// ============================================================================
// SECTION: Credential Cache
// ============================================================================

/// Acquire-once, read-many holder for the session credential.
#[derive(Debug, Default)]
pub struct CredentialCache {
    /// Initialized credential.
    cell: OnceLock<Credential>,
    /// Serializes the first provisioning attempt.
    init: Mutex<()>,
}

impl CredentialCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached credential, if provisioned.
    #[must_use]
    pub fn get(&self) -> Option<&Credential> {
        self.cell.get()
    }

    /// Returns the cached credential, running `provision` exactly once.
    ///
    /// A failed attempt leaves the cache empty.
    ///
    /// # Errors
    ///
    /// Returns the error from `provision`, or
    /// [`IdentityError::CachePoisoned`] when a prior attempt panicked.
    pub fn get_or_provision<F>(&self, provision: F) -> Result<&Credential, IdentityError>
    where
        F: FnOnce() -> Result<Credential, IdentityError>,
    {
        if let Some(credential) = self.cell.get() {
            return Ok(credential);
        }
        let _guard = self.init.lock().map_err(|_| IdentityError::CachePoisoned)?;
        if let Some(credential) = self.cell.get() {
            return Ok(credential);
        }
        let credential = provision()?;
        Ok(self.cell.get_or_init(|| credential))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Eight lowercase hex characters of randomness.
pub(crate) fn random_suffix() -> String {
    let value: u32 = rand::thread_rng().r#gen();
    format!("{value:08x}")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
