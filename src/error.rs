//! Error types for the Documint core.
//!
//! Three taxonomies, one per layer: [`ClientError`] for the remote content
//! API wrapper, [`SearchError`] for the cross-space aggregator, and
//! [`StoreError`] for the credential repository. Variants are explicit so
//! callers can distinguish "re-enter your credentials" from a generic
//! failure, and so transient rate limiting never surfaces as such — it is
//! retried internally and only its exhaustion is visible.

use thiserror::Error;

/// Errors from the remote content API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The external space id is unknown to the remote API.
    #[error("space not found: {space_id}")]
    NotFound { space_id: String },

    /// The access token was rejected. Surfaced distinctly so the connect
    /// flow can prompt for re-entry of credentials.
    #[error("access token rejected for space {space_id}")]
    Unauthorized { space_id: String },

    /// The remote API signalled a rate limit. Handled by the client's
    /// retry loop; callers only see it if retries are disabled.
    #[error("rate limited by the content API")]
    RateLimited { reset_secs: Option<u64> },

    /// Rate-limit retries were exhausted without a successful response.
    #[error("rate limit retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Any other non-success response from the remote API.
    #[error("content API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from the cross-space search aggregator.
///
/// Per-space failures during fan-out are swallowed and logged; only the
/// cases below abort a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Every selected space failed to answer the query.
    #[error("all {attempted} connected spaces failed to answer the search")]
    AllSourcesFailed { attempted: usize },

    /// A single-space scope named a space the user has not connected.
    #[error("no connected space matches {0}")]
    UnknownSpace(String),
}

/// Errors from the credential repository.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// The user already connected this external space id.
    #[error("space {0} is already connected")]
    Duplicate(String),

    #[error("no connected space with id {0}")]
    NotFound(String),

    /// The stored JSON record could not be decoded.
    #[error("corrupt credential record: {0}")]
    Corrupt(#[from] serde_json::Error),
}
