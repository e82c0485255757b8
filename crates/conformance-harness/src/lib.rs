// crates/conformance-harness/src/lib.rs
// ============================================================================
// Module: Conformance Harness Library
// Description: Black-box HTTP conformance checks for documented API contracts.
// Purpose: Resolve a target, provision an identity, and run contract scenarios.
// Dependencies: reqwest, serde, serde_json, serde_jcs, thiserror, rand, time, url
// ============================================================================

//! ## Overview
//! This crate verifies that a running web service honours a documented HTTP
//! contract without any knowledge of how the service is built. A run flows
//! through four layers:
//!
//! 1. [`target`] resolves the base address of the service under test.
//! 2. [`identity`] registers (or logs in) a synthetic user and caches the
//!    bearer credential for the whole session.
//! 3. [`client`] rewrites relative paths against the target and injects the
//!    credential on authenticated requests.
//! 4. [`scenarios`] runs an ordered battery of independent contract checks
//!    and records a per-scenario outcome in a [`report::RunReport`].
//!
//! Invariants:
//! - Configuration is read from the environment once, in [`config`], and
//!   passed by reference afterwards.
//! - Provisioning happens at most once per [`session::HarnessSession`].
//! - Bearer tokens never reach audit logs or reports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod readiness;
pub mod report;
pub mod scenarios;
pub mod session;
pub mod target;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use client::ClientError;
pub use client::RequestOptions;
pub use client::ScopedClient;
pub use client::ScopedResponse;
pub use config::HarnessConfig;
pub use config::SuiteKind;
pub use error::HarnessError;
pub use identity::Credential;
pub use identity::IdentityError;
pub use identity::Provisioner;
pub use identity::UserRef;
pub use report::RunReport;
pub use report::ScenarioRecord;
pub use scenarios::Suite;
pub use scenarios::run_suite;
pub use session::HarnessSession;
pub use target::DEFAULT_TARGET;
pub use target::TargetAddress;
pub use target::resolve_target;
