//! Domain Layer
//!
//! Core domain abstractions following the port/adapter pattern.
//!
//! # Architecture
//!
//! The domain layer is organized into:
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for external collaborators
//! - **Events** (`events.rs`) - Domain events for audit and decoupling
//!
//! # Usage
//!
//! ```ignore
//! use feedshard::domain::ports::{ContentStore, SocialGraph, UserId};
//!
//! async fn followed_posts<G, C>(graph: &G, content: &C, user: &UserId) -> Result<()>
//! where
//!     G: SocialGraph,
//!     C: ContentStore,
//! {
//!     for followee in graph.following(user).await? {
//!         let posts = content.recent_posts(&followee, 20).await?;
//!         // ...
//!     }
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod ports;

// Re-export commonly used types
pub use events::DomainEvent;
pub use ports::{
    ContentStore, EngagementCounts, EventPublisher, PostCandidate, PostId, SocialGraph,
    StorageBackend, UserId,
};
