//! FeedShard - Sharded Feed Access Layer
//!
//! A cached, sharded key-value access layer with a feed ranker on top.
//! Reads flow through a bounded LRU cache into a consistent-hash ring of
//! partitions, each fronted by a bounded connection pool; the ranker
//! assembles engagement-scored, time-decayed feeds over that path.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Feed Service                             │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │ Feed Ranker  │───▶│ Data Access  │───▶│    Shard     │       │
//! │  │ (score/sort) │    │ (LRU cache)  │    │   Manager    │       │
//! │  └──────────────┘    └──────────────┘    └──────┬───────┘       │
//! │                                                  │               │
//! │                                    ┌─────────────┴────────────┐ │
//! │                                    │  Hash Ring │ Conn Pools  │ │
//! │                                    └──────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`cache`] - Bounded LRU cache
//! - [`domain`] - Domain layer with ports and events (DDD)
//! - [`error`] - Error types
//! - [`metrics`] - Access counters and snapshots
//! - [`monitor`] - Periodic health checking and alerting
//! - [`pool`] - Per-partition connection pools
//! - [`ranker`] - Feed scoring and assembly
//! - [`ring`] - Consistent hash ring
//! - [`service`] - Composition root
//! - [`shard`] - Shard manager (ring + pools)
//! - [`store`] - Read-through data access layer

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod pool;
pub mod ranker;
pub mod ring;
pub mod service;
pub mod shard;
pub mod store;

// Re-export commonly used types
pub use cache::LruCache;
pub use domain::{EngagementCounts, PostCandidate, PostId, UserId};
pub use error::{Error, Result};
pub use metrics::{AccessMetrics, MetricsSnapshot};
pub use monitor::{HealthStatus, SystemHealthChecker};
pub use pool::{ConnectionHandle, ConnectionPool};
pub use ranker::{FeedRanker, RankedFeed, RankerConfig, ScoringWeights};
pub use ring::HashRing;
pub use service::{FeedService, ServiceConfig};
pub use shard::{ShardConfig, ShardManager};
pub use store::DataAccessLayer;
