//! Error types for the feedshard access layer

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the feedshard access layer
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors (fatal at construction)
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Exhaustion Errors (recoverable, caller decides retry/backoff)
    // =========================================================================
    /// Lookup on an empty hash ring
    #[error("No partition available: hash ring is empty")]
    RingEmpty,

    /// Connection pool has no free handles
    #[error("Connection pool exhausted for partition: {partition}")]
    PoolExhausted { partition: String },

    /// Partition exists but is not accepting traffic
    #[error("Partition is inactive: {0}")]
    PartitionInactive(String),

    // =========================================================================
    // Topology Errors
    // =========================================================================
    /// Partition already registered
    #[error("Partition already exists: {0}")]
    PartitionExists(String),

    /// Partition not registered
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    // =========================================================================
    // Backend Errors (collaborator failures, never cached)
    // =========================================================================
    /// Backend read failed
    #[error("Backend read failed for key {key}: {reason}")]
    BackendRead { key: String, reason: String },

    /// Backend write failed
    #[error("Backend write failed for key {key}: {reason}")]
    BackendWrite { key: String, reason: String },

    /// Collaborator call failed (social graph, content store)
    #[error("Collaborator error: {0}")]
    Backend(String),

    // =========================================================================
    // Ranking Errors
    // =========================================================================
    /// Too many followee fetches failed to assemble a useful feed
    #[error("Feed unavailable for user {user_id}: {failed_fetches} followee fetches failed")]
    FeedUnavailable {
        user_id: String,
        failed_fetches: usize,
    },

    // =========================================================================
    // Plumbing
    // =========================================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check whether this error is a transient exhaustion condition that a
    /// caller may reasonably retry after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RingEmpty | Error::PoolExhausted { .. } | Error::PartitionInactive(_)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
