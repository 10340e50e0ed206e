//! Domain error types.
//!
//! Only the seams where callers branch on the failure get typed errors;
//! everything else flows through `anyhow` with context, matching how the
//! storage and adapter layers report problems. Note that a duplicate posting
//! is not an error at all — the dedup gate returns an outcome enum.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the rate-limited HTTP transport.
///
/// Transient failures (configured status codes, timeouts, connection resets)
/// are retried internally and only reach the caller once retries are
/// exhausted.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures returned synchronously by `Orchestrator::trigger`.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// A batch is already scheduled or running. At most one batch may be
    /// active system-wide; no job is created for the rejected call.
    #[error("a harvest batch is already scheduled or running")]
    Busy,

    #[error("failed to persist job state: {0:#}")]
    Storage(anyhow::Error),
}
