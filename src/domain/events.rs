//! Domain Events
//!
//! Immutable records of significant occurrences in the access layer, used
//! for audit logging and decoupling components from their side effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain event representing a significant occurrence in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    // =========================================================================
    // Shard Topology Events
    // =========================================================================
    /// A partition was added to the ring with its connection pool.
    ShardAdded {
        partition_id: String,
        region: String,
        pool_capacity: usize,
        timestamp: DateTime<Utc>,
    },

    /// A partition was removed from the ring.
    ShardRemoved {
        partition_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A partition was deactivated for draining.
    ShardDeactivated {
        partition_id: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Feed Events
    // =========================================================================
    /// A feed was assembled for a user.
    FeedAssembled {
        user_id: String,
        post_count: usize,
        partial: bool,
        from_cache: bool,
        timestamp: DateTime<Utc>,
    },

    /// A user's cached feed was explicitly invalidated.
    FeedInvalidated {
        user_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the event type as a string (for logging and filtering).
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ShardAdded { .. } => "ShardAdded",
            DomainEvent::ShardRemoved { .. } => "ShardRemoved",
            DomainEvent::ShardDeactivated { .. } => "ShardDeactivated",
            DomainEvent::FeedAssembled { .. } => "FeedAssembled",
            DomainEvent::FeedInvalidated { .. } => "FeedInvalidated",
        }
    }

    /// Get the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ShardAdded { timestamp, .. }
            | DomainEvent::ShardRemoved { timestamp, .. }
            | DomainEvent::ShardDeactivated { timestamp, .. }
            | DomainEvent::FeedAssembled { timestamp, .. }
            | DomainEvent::FeedInvalidated { timestamp, .. } => *timestamp,
        }
    }

    /// Convenience constructor for a shard-added event stamped now.
    pub fn shard_added(
        partition_id: impl Into<String>,
        region: impl Into<String>,
        pool_capacity: usize,
    ) -> Self {
        DomainEvent::ShardAdded {
            partition_id: partition_id.into(),
            region: region.into(),
            pool_capacity,
            timestamp: Utc::now(),
        }
    }

    /// Convenience constructor for a shard-removed event stamped now.
    pub fn shard_removed(partition_id: impl Into<String>) -> Self {
        DomainEvent::ShardRemoved {
            partition_id: partition_id.into(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
