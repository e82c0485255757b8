// crates/conformance-harness/src/session.rs
// ============================================================================
// Module: Harness Session
// Description: Shared state for one conformance run.
// Purpose: Own the HTTP client, audit sink and cached session credential.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! A [`HarnessSession`] is built once per run. It owns a single pooled
//! `reqwest` client (cloning it shares the pool), the audit sink and the
//! [`CredentialCache`]. Scenarios borrow it; they never construct clients of
//! their own. The credential is provisioned lazily on first use and reused
//! for the rest of the session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use reqwest::blocking::Client;

use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::client::ScopedClient;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::identity::Credential;
use crate::identity::CredentialCache;
use crate::identity::IdentityError;
use crate::identity::Provisioner;

// ============================================================================
// SECTION: Session
// ============================================================================

/// Shared state for a single run.
pub struct HarnessSession {
    /// Run configuration.
    config: HarnessConfig,
    /// Pooled HTTP client shared by every scoped client.
    http: Client,
    /// Audit sink for requests, provisioning and scenarios.
    audit: Arc<dyn AuditSink>,
    /// Session credential, provisioned at most once.
    credential: CredentialCache,
}

impl HarnessSession {
    /// Creates a session with an explicit audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Client`] when the HTTP client cannot be built.
    pub fn new(config: HarnessConfig, audit: Arc<dyn AuditSink>) -> Result<Self, HarnessError> {
        let http = ScopedClient::build_http(config.timeout)?;
        Ok(Self {
            config,
            http,
            audit,
            credential: CredentialCache::new(),
        })
    }

    /// Creates a session that audits to `config.audit_log` when set and
    /// discards audit events otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AuditLog`] when the log cannot be opened, or
    /// any error from [`HarnessSession::new`].
    pub fn from_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        let audit: Arc<dyn AuditSink> = match &config.audit_log {
            Some(path) => Arc::new(FileAuditSink::new(path).map_err(|source| {
                HarnessError::AuditLog {
                    path: path.clone(),
                    source,
                }
            })?),
            None => Arc::new(NoopAuditSink),
        };
        Self::new(config, audit)
    }

    /// Returns the run configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }

    /// Returns an unauthenticated client scoped to the target.
    #[must_use]
    pub fn anonymous(&self) -> ScopedClient {
        ScopedClient::new(self.config.target.clone(), self.http.clone(), self.audit())
    }

    /// Returns a provisioner bound to the target.
    #[must_use]
    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(self.anonymous(), self.audit())
    }

    /// Returns the session credential, provisioning it on first use.
    ///
    /// # Errors
    ///
    /// Returns the provisioning failure; the next call retries.
    pub fn credential(&self) -> Result<&Credential, IdentityError> {
        self.credential.get_or_provision(|| self.provisioner().provision())
    }

    /// Returns a client carrying the session credential.
    ///
    /// # Errors
    ///
    /// See [`HarnessSession::credential`].
    pub fn authenticated(&self) -> Result<ScopedClient, IdentityError> {
        let credential = self.credential()?;
        Ok(self.client_for(credential))
    }

    /// Returns a client carrying an arbitrary credential.
    #[must_use]
    pub fn client_for(&self, credential: &Credential) -> ScopedClient {
        self.anonymous().with_bearer(credential.token.clone())
    }
}
