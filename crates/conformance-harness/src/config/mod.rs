// crates/conformance-harness/src/config/mod.rs
// ============================================================================
// Module: Harness Configuration
// Description: Centralized configuration for conformance runs.
// Purpose: Provide typed access to environment settings and defaults.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! Harness configuration is read from environment variables once, at process
//! start, and mapped into a small typed structure that is passed by reference
//! into the session, provisioning and scenario layers.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::ConfigError;
pub use env::DEFAULT_TIMEOUT;
pub use env::HarnessConfig;
pub use env::HarnessEnv;
pub use env::SuiteKind;
pub use env::read_env_strict;
