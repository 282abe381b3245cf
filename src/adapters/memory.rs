//! In-Memory Adapters
//!
//! Process-local implementations of the domain ports, used by the demo
//! binary and the test suite. `InMemoryStorageBackend` doubles as a fault
//! injector so failure paths can be exercised deterministically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

use crate::domain::{ContentStore, PostCandidate, SocialGraph, StorageBackend, UserId};
use crate::error::{Error, Result};
use crate::pool::ConnectionHandle;
use crate::store::DataAccessLayer;

// =============================================================================
// Storage Backend
// =============================================================================

/// DashMap-backed storage backend with switchable fault injection.
#[derive(Debug, Default)]
pub struct InMemoryStorageBackend {
    data: DashMap<String, Bytes>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value directly, bypassing the access layer.
    pub fn seed(&self, key: &str, value: &[u8]) {
        self.data
            .insert(key.to_string(), Bytes::copy_from_slice(value));
    }

    /// Make subsequent reads fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reads attempted against the backend, including failed ones.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Writes attempted against the backend, including failed ones.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorageBackend {
    async fn read(&self, _conn: &ConnectionHandle, key: &str) -> Result<Option<Bytes>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::BackendRead {
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        Ok(self.data.get(key).map(|v| v.clone()))
    }

    async fn write(&self, _conn: &ConnectionHandle, key: &str, value: Bytes) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::BackendWrite {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        self.data.insert(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// Social Graph
// =============================================================================

/// DashMap-backed follow graph.
#[derive(Debug, Default)]
pub struct InMemorySocialGraph {
    edges: DashMap<UserId, Vec<UserId>>,
}

impl InMemorySocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `follower` follows `followee`. Idempotent.
    pub fn follow(&self, follower: &UserId, followee: &UserId) {
        let mut entry = self.edges.entry(follower.clone()).or_default();
        if !entry.contains(followee) {
            entry.push(followee.clone());
        }
    }
}

#[async_trait]
impl SocialGraph for InMemorySocialGraph {
    async fn following(&self, user_id: &UserId) -> Result<Vec<UserId>> {
        Ok(self
            .edges
            .get(user_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}

// =============================================================================
// Content Store
// =============================================================================

/// DashMap-backed post store with per-author fault injection.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    posts: DashMap<UserId, Vec<PostCandidate>>,
    failing_authors: DashSet<UserId>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a post under its author, keeping the author's list newest first.
    pub fn add_post(&self, post: PostCandidate) {
        let mut entry = self.posts.entry(post.author_id.clone()).or_default();
        entry.push(post);
        entry.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    /// Make fetches for this author fail.
    pub fn fail_for(&self, author: &UserId) {
        self.failing_authors.insert(author.clone());
    }

    /// Restore fetches for this author.
    pub fn recover(&self, author: &UserId) {
        self.failing_authors.remove(author);
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn recent_posts(&self, user_id: &UserId, limit: usize) -> Result<Vec<PostCandidate>> {
        if self.failing_authors.contains(user_id) {
            return Err(Error::Backend(format!(
                "content store unavailable for author {}",
                user_id
            )));
        }

        Ok(self
            .posts
            .get(user_id)
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// Sharded Content Store
// =============================================================================

/// Post records as persisted under `posts/{author}`.
#[derive(Debug, Serialize, Deserialize)]
struct AuthorPosts {
    posts: Vec<PostCandidate>,
}

/// Content store backed by the sharded data access layer.
///
/// Each author's posts live as one JSON document under `posts/{author}`,
/// newest first, so feed assembly exercises the full read-through path:
/// cache, ring routing, pooled connection, backend.
pub struct ShardedContentStore {
    store: Arc<DataAccessLayer>,
}

impl ShardedContentStore {
    pub fn new(store: Arc<DataAccessLayer>) -> Self {
        Self { store }
    }

    fn key_for(author: &UserId) -> String {
        format!("posts/{}", author)
    }

    /// Append a post to its author's document (read-modify-write).
    ///
    /// Not atomic against concurrent publishes for the same author; the demo
    /// workload publishes from a single task per author.
    pub async fn publish_post(&self, post: PostCandidate) -> Result<()> {
        let key = Self::key_for(&post.author_id);

        let mut record = match self.store.read(&key).await? {
            Some(bytes) => serde_json::from_slice::<AuthorPosts>(&bytes)?,
            None => AuthorPosts { posts: Vec::new() },
        };

        record.posts.push(post);
        record.posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let bytes = Bytes::from(serde_json::to_vec(&record)?);
        self.store.write(&key, bytes).await
    }
}

#[async_trait]
impl ContentStore for ShardedContentStore {
    async fn recent_posts(&self, user_id: &UserId, limit: usize) -> Result<Vec<PostCandidate>> {
        let record = match self.store.read(&Self::key_for(user_id)).await? {
            Some(bytes) => serde_json::from_slice::<AuthorPosts>(&bytes)?,
            None => return Ok(Vec::new()),
        };

        Ok(record.posts.into_iter().take(limit).collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EngagementCounts;
    use crate::metrics::AccessMetrics;
    use crate::shard::{ShardConfig, ShardManager};
    use chrono::{Duration, Utc};

    fn handle() -> ConnectionHandle {
        let pool = crate::pool::ConnectionPool::new("test", 1).unwrap();
        pool.acquire().unwrap()
    }

    #[tokio::test]
    async fn test_backend_read_write() {
        let backend = InMemoryStorageBackend::new();
        let conn = handle();

        assert_eq!(backend.read(&conn, "k").await.unwrap(), None);
        backend
            .write(&conn, "k", Bytes::from("v"))
            .await
            .unwrap();
        assert_eq!(backend.read(&conn, "k").await.unwrap(), Some(Bytes::from("v")));
    }

    #[tokio::test]
    async fn test_backend_fault_injection() {
        let backend = InMemoryStorageBackend::new();
        let conn = handle();
        backend.seed("k", b"v");

        backend.fail_reads(true);
        assert!(backend.read(&conn, "k").await.is_err());
        backend.fail_reads(false);
        assert!(backend.read(&conn, "k").await.is_ok());

        backend.fail_writes(true);
        assert!(backend.write(&conn, "k", Bytes::from("x")).await.is_err());
        // The failed write did not land
        assert_eq!(backend.read(&conn, "k").await.unwrap(), Some(Bytes::from("v")));
    }

    #[tokio::test]
    async fn test_social_graph_follow_idempotent() {
        let graph = InMemorySocialGraph::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        graph.follow(&alice, &bob);
        graph.follow(&alice, &bob);

        assert_eq!(graph.following(&alice).await.unwrap(), vec![bob]);
        assert!(graph.following(&UserId::new("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_content_store_newest_first_with_limit() {
        let content = InMemoryContentStore::new();
        let author = UserId::new("author");
        let now = Utc::now();

        for i in 0..5 {
            content.add_post(PostCandidate::new(
                format!("p{}", i),
                "author",
                now - Duration::hours(i),
                EngagementCounts::default(),
            ));
        }

        let posts = content.recent_posts(&author, 3).await.unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2"]);
    }

    #[tokio::test]
    async fn test_content_store_failure_injection() {
        let content = InMemoryContentStore::new();
        let author = UserId::new("author");

        content.fail_for(&author);
        assert!(content.recent_posts(&author, 10).await.is_err());

        content.recover(&author);
        assert!(content.recent_posts(&author, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_sharded_content_store_roundtrip() {
        let shards = Arc::new(ShardManager::new(64).unwrap());
        shards
            .add_shard(ShardConfig::new("p1", "us-east-1", 4))
            .unwrap();
        let backend = Arc::new(InMemoryStorageBackend::new());
        let dal = Arc::new(
            DataAccessLayer::new(shards, backend, 16, Arc::new(AccessMetrics::new())).unwrap(),
        );

        let content = ShardedContentStore::new(dal);
        let author = UserId::new("alice");
        let now = Utc::now();

        content
            .publish_post(PostCandidate::new(
                "old",
                "alice",
                now - Duration::hours(2),
                EngagementCounts::new(1, 0, 0),
            ))
            .await
            .unwrap();
        content
            .publish_post(PostCandidate::new(
                "new",
                "alice",
                now,
                EngagementCounts::new(2, 0, 0),
            ))
            .await
            .unwrap();

        let posts = content.recent_posts(&author, 10).await.unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        // Limit clips to the newest
        let one = content.recent_posts(&author, 1).await.unwrap();
        assert_eq!(one[0].post_id.as_str(), "new");
    }
}
