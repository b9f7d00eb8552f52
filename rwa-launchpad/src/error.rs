//! Error types for the RWA Launchpad core.
//!
//! This module defines all error types that can occur during launchpad
//! operations. All errors implement the standard [`std::error::Error`] trait
//! via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Lookup errors** ([`LaunchpadError::PlanNotFound`],
//!   [`LaunchpadError::SubscriptionNotFound`]): a referenced row does not
//!   resolve in the data service
//! - **Billing errors** ([`LaunchpadError::UnknownInterval`]): a plan row
//!   carries an interval outside the supported set
//! - **Store errors** ([`LaunchpadError::Store`]): the relational data
//!   service rejected a request or is misconfigured
//! - **Chain errors** ([`LaunchpadError::Rpc`], [`LaunchpadError::Abi`]):
//!   JSON-RPC failures and calldata/log codec failures
//! - **Network errors** ([`LaunchpadError::Http`]): transport-level failures
//!   talking to the data service, the RPC node, or a webhook endpoint
//! - **Validation errors** ([`LaunchpadError::InvalidAddress`],
//!   [`LaunchpadError::InvalidAmount`], [`LaunchpadError::InvalidLaunchParams`]):
//!   caller-supplied input rejected before any side effect

use thiserror::Error;

/// Result type alias for launchpad operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, LaunchpadError>;

/// Errors that can occur in the launchpad core.
///
/// All variants include contextual information about what went wrong, and
/// the messages are designed to be user-facing.
///
/// Payment verification deliberately does NOT surface failures through this
/// type: an unverifiable transaction is an expected outcome of
/// user-submitted hashes and is reported as a `verified: false` result
/// instead (see [`crate::payments::VerificationResult`]). Only
/// infrastructure failures (store unreachable, malformed configuration)
/// reach the caller as errors.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum LaunchpadError {
    /// Configuration is missing or invalid.
    ///
    /// Raised at process start, never deferred to first use: a missing
    /// data-service URL or key fails construction of the store, not the
    /// first query through it.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The relational data service rejected a request.
    ///
    /// Carries the HTTP status and response body returned by the service.
    /// Store errors are fatal to the operation that hit them; lifecycle
    /// mutations never retry or partially apply.
    #[error("data service error: {0}")]
    Store(String),

    /// Transport-level HTTP failure.
    ///
    /// Wraps [`reqwest::Error`] for any outbound call: data service, chain
    /// RPC node, or webhook endpoint. Common causes are timeouts, DNS
    /// failures, and connection refusal.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The RPC node returned a JSON-RPC error object or a malformed
    /// response.
    #[error("chain RPC error: {0}")]
    Rpc(String),

    /// ABI encoding or decoding failed.
    ///
    /// Raised for malformed calldata, truncated return data, and
    /// out-of-bounds offsets. Per-log decode misses during event extraction
    /// are NOT errors; they are skipped silently.
    #[error("ABI codec error: {0}")]
    Abi(String),

    /// The referenced plan does not exist.
    #[error("plan not found: {0}")]
    PlanNotFound(String),

    /// The referenced subscription (or its associated plan) does not exist.
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// A plan row carries a billing interval outside
    /// {weekly, monthly, yearly}.
    ///
    /// Silently treating an unknown interval as a zero-length billing
    /// period would grant no access while recording a successful payment;
    /// the row is refused instead.
    #[error("unknown billing interval: {0}")]
    UnknownInterval(String),

    /// A wallet or contract address failed to parse.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// An amount is negative, too precise for wei conversion, or otherwise
    /// unrepresentable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Property launch parameters failed validation.
    #[error("invalid launch parameters: {0}")]
    InvalidLaunchParams(String),
}
