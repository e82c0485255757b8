// crates/conformance-harness/src/target.rs
// ============================================================================
// Module: Target Resolution
// Description: Base address of the service under test.
// Purpose: Pick the target address once per run and join request paths.
// Dependencies: url
// ============================================================================

//! ## Overview
//! The target is a scheme + host + port base address chosen once per run from
//! an optional override, falling back to [`DEFAULT_TARGET`]. Resolution is
//! pure: reachability is never probed here, so an unreachable target surfaces
//! as a transport failure in the scenarios that use it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Base address used when no override is configured.
pub const DEFAULT_TARGET: &str = "http://localhost:8000";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Immutable base address of the service under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetAddress(String);

impl TargetAddress {
    /// Wraps a base address without validating it.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Returns the base address as provided.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves `path` against the base address.
    ///
    /// Absolute `http://` and `https://` inputs are returned untouched. Any
    /// other input is appended to the base, without doubling a `/` at the seam.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if is_absolute(path) {
            return path.to_string();
        }
        let base = self.0.trim_end_matches('/');
        if path.is_empty() {
            return base.to_string();
        }
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Returns the effective port, using the scheme default when none is set.
    ///
    /// Returns `None` when the base address does not parse as a URL.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        Url::parse(&self.0).ok().and_then(|url| url.port_or_known_default())
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Chooses the base address for a run.
///
/// A present, non-blank `override_value` wins; otherwise `default` is used.
#[must_use]
pub fn resolve_target(override_value: Option<&str>, default: &str) -> TargetAddress {
    match override_value.map(str::trim) {
        Some(value) if !value.is_empty() => TargetAddress::new(value),
        _ => TargetAddress::new(default),
    }
}

/// Returns true when `path` already carries an HTTP scheme.
fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
