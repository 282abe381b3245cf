//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the narrow contracts the access layer requires from
//! its external collaborators. Infrastructure adapters implement these traits
//! to provide concrete implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │  StorageBackend │ SocialGraph │ ContentStore         │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  InMemoryStorageBackend │ ShardedContentStore        │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pool::ConnectionHandle;

// =============================================================================
// Value Objects
// =============================================================================

/// User identifier (value object).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Post identifier (value object).
///
/// Ordered so that ranking ties can be broken deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Engagement counters for a post (value object).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
}

impl EngagementCounts {
    pub fn new(likes: u64, shares: u64, comments: u64) -> Self {
        Self {
            likes,
            shares,
            comments,
        }
    }

    /// Total raw interactions, unweighted.
    pub fn total(&self) -> u64 {
        self.likes + self.shares + self.comments
    }
}

/// A candidate post for ranking.
///
/// Ownership of the underlying record belongs to the data access layer's
/// cache; the ranker only ever reads a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostCandidate {
    pub post_id: PostId,
    pub author_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub engagement: EngagementCounts,
}

impl PostCandidate {
    pub fn new(
        post_id: impl Into<String>,
        author_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        engagement: EngagementCounts,
    ) -> Self {
        Self {
            post_id: PostId::new(post_id),
            author_id: UserId::new(author_id),
            timestamp,
            engagement,
        }
    }
}

// =============================================================================
// Storage Backend Port
// =============================================================================

/// Port for the durable storage backend behind each partition.
///
/// The access layer treats the backend as opaque: reads and writes are keyed
/// by a caller-supplied sharding key and carry the connection handle lent out
/// by the partition's pool. No wire format is specified here.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// `Ok(None)` is an ordinary miss; `Err` is a backend failure and must
    /// never be cached as if it were a value.
    async fn read(&self, conn: &ConnectionHandle, key: &str) -> Result<Option<Bytes>>;

    /// Write `value` under `key`.
    async fn write(&self, conn: &ConnectionHandle, key: &str, value: Bytes) -> Result<()>;
}

// =============================================================================
// Social Graph Port
// =============================================================================

/// Port for the "who follows whom" collaborator.
///
/// Consumed read-only by the feed ranker.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// The set of users `user_id` follows.
    async fn following(&self, user_id: &UserId) -> Result<Vec<UserId>>;
}

// =============================================================================
// Content Store Port
// =============================================================================

/// Port for the post-record collaborator.
///
/// Consumed read-only by the feed ranker; the core does not define how posts
/// are created or persisted.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Up to `limit` most recent posts by `user_id`, newest first.
    async fn recent_posts(&self, user_id: &UserId, limit: usize) -> Result<Vec<PostCandidate>>;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

use super::events::DomainEvent;

/// Port for publishing domain events.
///
/// This trait abstracts event publishing, allowing different backends
/// (logging, in-memory collection, message bus) to be used.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event.
    async fn publish(&self, event: DomainEvent) -> Result<()>;

    /// Publish multiple events.
    async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
