//! Error taxonomy for the distribution engine.
//!
//! Each error type maps onto one containment level: a `FetchError` aborts the
//! current run, an `RpcError` or `TransferError` fails a single attempt, and a
//! `StoreError` is fatal because the durable sent/pending sets are the sole
//! source of truth across restarts.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to fetch the candidate address list. Aborts the current run only;
/// the run is retried at the next scheduled cadence.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Http(reqwest::StatusCode),
}

/// Durable state I/O failure. Fatal: proceeding with a partial view of the
/// `sent` set could double-pay recipients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transport-level failure talking to the node.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited by RPC endpoint")]
    RateLimited,

    #[error("unexpected HTTP status {0}")]
    Http(reqwest::StatusCode),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Whether the failure is worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::RateLimited => true,
            RpcError::Network(e) => e.is_timeout() || e.is_connect(),
            RpcError::Http(status) => status.is_server_error(),
            RpcError::Rpc(_) | RpcError::InvalidResponse(_) => false,
        }
    }
}

/// Failure of one transfer attempt. Contained to one recipient; the run
/// continues with the next one.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The recipient address does not decode to a 32-byte account id.
    #[error("invalid recipient address '{address}'")]
    InvalidRecipient { address: String },

    /// Submission was refused before the transaction entered the mempool.
    #[error("submit failed: {0}")]
    Submit(#[source] RpcError),

    /// The chain rejected the transaction after submission.
    #[error("transaction {hash} rejected: {reason}")]
    Rejected { hash: String, reason: String },

    /// The transaction did not reach the confirmation depth in time.
    #[error("confirmation timed out for {hash}")]
    ConfirmTimeout { hash: String },

    /// The shutdown signal interrupted the attempt.
    #[error("cancelled by shutdown")]
    Cancelled,
}

/// Run-level failure returned by the scheduler.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("candidate fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_transient() {
        assert!(RpcError::RateLimited.is_transient());
    }

    #[test]
    fn test_rpc_rejection_is_permanent() {
        assert!(!RpcError::Rpc("insufficient balance".to_string()).is_transient());
        assert!(!RpcError::InvalidResponse("garbage".to_string()).is_transient());
    }

    #[test]
    fn test_server_error_is_transient() {
        assert!(RpcError::Http(reqwest::StatusCode::BAD_GATEWAY).is_transient());
        assert!(!RpcError::Http(reqwest::StatusCode::BAD_REQUEST).is_transient());
    }
}
