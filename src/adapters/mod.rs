//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │  StorageBackend │ SocialGraph │ ContentStore │ EventPub    │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ InMemoryStorageBackend │ InMemorySocialGraph               │ │
//! │  │ InMemoryContentStore │ ShardedContentStore                 │ │
//! │  │ LoggingEventPublisher │ AlertChannel                       │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use feedshard::adapters::{InMemoryStorageBackend, ShardedContentStore};
//! use feedshard::domain::ContentStore;
//!
//! let content = ShardedContentStore::new(dal);
//! let posts = content.recent_posts(&author, 20).await?;
//! ```

mod event_publisher;
mod memory;
mod notifier;

pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use memory::{
    InMemoryContentStore, InMemorySocialGraph, InMemoryStorageBackend, ShardedContentStore,
};
pub use notifier::AlertChannel;
