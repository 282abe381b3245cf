//! Data Access Layer
//!
//! Read-through cached access to the sharded storage backend.
//!
//! # Read path
//!
//! ```text
//!   read(key) ── cache hit ──────────────────────────▶ value
//!        │
//!        └─ miss ─▶ route ─▶ acquire conn ─▶ backend ─▶ populate ─▶ value
//! ```
//!
//! # Rules
//!
//! - No lock is held across backend I/O; concurrent misses on the same key
//!   may each hit the backend and populate the cache redundantly, which is
//!   harmless with last-writer-wins semantics
//! - Acquired connections are released on every path, success or failure
//! - A backend miss is never cached; a repeated read of an absent key hits
//!   the backend each time
//! - Writes invalidate the cached entry whether the backend write succeeded
//!   or not, so a failed write can only cause a refetch, never a stale read

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::cache::{CacheStats, LruCache};
use crate::domain::StorageBackend;
use crate::error::Result;
use crate::metrics::AccessMetrics;
use crate::shard::ShardManager;

/// Cached, sharded access to the storage backend.
pub struct DataAccessLayer {
    shards: Arc<ShardManager>,
    backend: Arc<dyn StorageBackend>,
    cache: LruCache<String, Bytes>,
    metrics: Arc<AccessMetrics>,
}

impl DataAccessLayer {
    pub fn new(
        shards: Arc<ShardManager>,
        backend: Arc<dyn StorageBackend>,
        cache_capacity: usize,
        metrics: Arc<AccessMetrics>,
    ) -> Result<Self> {
        Ok(Self {
            shards,
            backend,
            cache: LruCache::new(cache_capacity)?,
            metrics,
        })
    }

    /// Read a value, serving from cache when possible.
    ///
    /// On a miss the key is routed to its partition, a connection is
    /// acquired, and the backend value (if any) populates the cache.
    pub async fn read(&self, key: &str) -> Result<Option<Bytes>> {
        if let Some(value) = self.cache.get(&key.to_string()) {
            self.metrics.record_cache_hit();
            debug!(key, "Cache hit");
            return Ok(Some(value));
        }
        self.metrics.record_cache_miss();

        let (partition, handle) = self.shards.route_and_acquire(key)?;
        self.metrics.record_backend_read();

        // Hold no lock across the backend call; release the connection on
        // both the success and the failure path before propagating.
        let outcome = self.backend.read(&handle, key).await;
        self.shards.release(&partition, handle)?;

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                self.metrics.record_backend_failure();
                return Err(err);
            }
        };

        if let Some(ref bytes) = value {
            self.cache.put(key.to_string(), bytes.clone());
            debug!(key, partition = %partition, "Cache populated from backend");
        }

        Ok(value)
    }

    /// Write a value to the backend, then invalidate the cached entry.
    ///
    /// Invalidation happens even when the backend write fails: the entry's
    /// freshness is unknown at that point, and dropping it costs at most one
    /// refetch.
    pub async fn write(&self, key: &str, value: Bytes) -> Result<()> {
        let (partition, handle) = self.shards.route_and_acquire(key)?;
        self.metrics.record_backend_write();

        let outcome = self.backend.write(&handle, key, value).await;
        self.shards.release(&partition, handle)?;

        if self.cache.invalidate(&key.to_string()).is_some() {
            self.metrics.record_invalidation();
        }

        match outcome {
            Ok(()) => {
                debug!(key, partition = %partition, "Write committed, cache invalidated");
                Ok(())
            }
            Err(err) => {
                self.metrics.record_backend_failure();
                Err(err)
            }
        }
    }

    /// Drop the cached entry for a key, if present.
    pub fn invalidate(&self, key: &str) -> bool {
        let dropped = self.cache.invalidate(&key.to_string()).is_some();
        if dropped {
            self.metrics.record_invalidation();
        }
        dropped
    }

    /// Value-cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Shard manager backing this layer.
    pub fn shards(&self) -> &Arc<ShardManager> {
        &self.shards
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStorageBackend;
    use crate::error::Error;
    use crate::shard::ShardConfig;
    use assert_matches::assert_matches;

    fn dal_fixture(cache_capacity: usize) -> (DataAccessLayer, Arc<InMemoryStorageBackend>) {
        let shards = Arc::new(ShardManager::new(64).unwrap());
        shards
            .add_shard(ShardConfig::new("p1", "us-east-1", 4))
            .unwrap();
        shards
            .add_shard(ShardConfig::new("p2", "eu-west-1", 4))
            .unwrap();

        let backend = Arc::new(InMemoryStorageBackend::new());
        let dal = DataAccessLayer::new(
            shards,
            backend.clone(),
            cache_capacity,
            Arc::new(AccessMetrics::new()),
        )
        .unwrap();
        (dal, backend)
    }

    #[tokio::test]
    async fn test_read_through_populates_cache() {
        let (dal, backend) = dal_fixture(16);
        backend.seed("user:1", b"alice");

        // First read misses the cache and hits the backend
        assert_eq!(dal.read("user:1").await.unwrap(), Some(Bytes::from("alice")));
        assert_eq!(backend.read_count(), 1);

        // Second read is served from cache
        assert_eq!(dal.read("user:1").await.unwrap(), Some(Bytes::from("alice")));
        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn test_absent_key_not_cached() {
        let (dal, backend) = dal_fixture(16);

        assert_eq!(dal.read("ghost").await.unwrap(), None);
        assert_eq!(dal.read("ghost").await.unwrap(), None);

        // Negative results always go to the backend
        assert_eq!(backend.read_count(), 2);
    }

    #[tokio::test]
    async fn test_write_invalidates_cached_entry() {
        let (dal, backend) = dal_fixture(16);
        backend.seed("user:1", b"old");

        assert_eq!(dal.read("user:1").await.unwrap(), Some(Bytes::from("old")));

        dal.write("user:1", Bytes::from("new")).await.unwrap();

        // Next read refetches the fresh value
        assert_eq!(dal.read("user:1").await.unwrap(), Some(Bytes::from("new")));
        assert_eq!(backend.read_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_still_invalidates() {
        let (dal, backend) = dal_fixture(16);
        backend.seed("user:1", b"old");
        dal.read("user:1").await.unwrap();

        backend.fail_writes(true);
        assert_matches!(
            dal.write("user:1", Bytes::from("new")).await,
            Err(Error::BackendWrite { .. })
        );
        backend.fail_writes(false);

        // The stale entry is gone; the read goes back to the backend
        assert_eq!(dal.read("user:1").await.unwrap(), Some(Bytes::from("old")));
        assert_eq!(backend.read_count(), 2);
    }

    #[tokio::test]
    async fn test_backend_read_failure_propagates() {
        let (dal, backend) = dal_fixture(16);
        backend.seed("user:1", b"alice");
        backend.fail_reads(true);

        assert_matches!(dal.read("user:1").await, Err(Error::BackendRead { .. }));

        // The connection was released despite the failure
        backend.fail_reads(false);
        assert!(dal.read("user:1").await.is_ok());
        let stats = dal.shards().pool_stats();
        assert!(stats.iter().all(|s| s.in_use == 0));
    }

    #[tokio::test]
    async fn test_connections_released_under_load() {
        let (dal, backend) = dal_fixture(4);
        for i in 0..32 {
            backend.seed(&format!("key:{}", i), b"v");
        }

        for i in 0..32 {
            dal.read(&format!("key:{}", i)).await.unwrap();
        }

        let stats = dal.shards().pool_stats();
        for stat in stats {
            assert_eq!(stat.in_use, 0);
            assert_eq!(stat.available, stat.capacity);
        }
    }

    #[tokio::test]
    async fn test_eviction_keeps_cache_bounded() {
        let (dal, backend) = dal_fixture(2);
        for key in ["a", "b", "c"] {
            backend.seed(key, key.as_bytes());
            dal.read(key).await.unwrap();
        }

        let stats = dal.cache_stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_explicit_invalidate() {
        let (dal, backend) = dal_fixture(16);
        backend.seed("user:1", b"alice");
        dal.read("user:1").await.unwrap();

        assert!(dal.invalidate("user:1"));
        assert!(!dal.invalidate("user:1"));

        dal.read("user:1").await.unwrap();
        assert_eq!(backend.read_count(), 2);
    }
}
