// crates/conformance-harness/src/readiness.rs
// ============================================================================
// Module: Readiness Probe
// Description: Polls the target until it answers HTTP requests.
// Purpose: Let callers start a service and wait for it without fixed sleeps.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`wait_for_target`] issues `GET /` every 50 ms until any HTTP response
//! arrives. The status code is irrelevant: a `404` or `401` still proves the
//! listener is up. Only transport failures count as "not ready".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use reqwest::Method;
use thiserror::Error;

use crate::client::ClientError;
use crate::client::RequestOptions;
use crate::client::ScopedClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Delay between probe attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound on a single probe request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// The target never answered within the readiness window.
#[derive(Debug, Clone, Error)]
#[error("target {target} not ready after {attempts} attempts: {last_error}")]
pub struct ReadinessError {
    /// Target base address.
    pub target: String,
    /// Number of probes issued.
    pub attempts: u32,
    /// Last transport failure observed.
    pub last_error: ClientError,
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Polls the target root until any HTTP response arrives or `timeout` expires.
///
/// Returns the number of attempts it took.
///
/// # Errors
///
/// Returns [`ReadinessError`] when every probe failed at the transport level.
pub fn wait_for_target(client: &ScopedClient, timeout: Duration) -> Result<u32, ReadinessError> {
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        let budget = timeout.saturating_sub(start.elapsed()).clamp(POLL_INTERVAL, PROBE_TIMEOUT);
        match client.send(Method::GET, "/", RequestOptions::new().timeout(budget)) {
            Ok(_) => return Ok(attempts),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(ReadinessError {
                        target: client.target().to_string(),
                        attempts,
                        last_error: err,
                    });
                }
                sleep(POLL_INTERVAL);
            }
        }
    }
}
