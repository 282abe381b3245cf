//! Feed Service
//!
//! Composition root for the access layer. Owns the shard manager, the
//! data access layer, the ranker, and the feed-level cache; every
//! collaborator is injected at construction, nothing is process-global.
//!
//! # Feed cache policy
//!
//! Only complete (non-partial) feeds are cached, together with whether the
//! assembly was clipped by its page size. A request is a hit when the cached
//! list covers the page or is exhaustive (the user's whole feed was shorter
//! than the page it was assembled for); a clipped entry shorter than the
//! requested page is a miss so a larger page is never served a truncated
//! result. Cached lists longer than the page are truncated on the way out.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::{CacheStats, LruCache, DEFAULT_CACHE_CAPACITY, DEFAULT_FEED_CACHE_CAPACITY};
use crate::domain::{
    ContentStore, DomainEvent, EventPublisher, SocialGraph, StorageBackend, UserId,
};
use crate::error::{Error, Result};
use crate::metrics::AccessMetrics;
use crate::ranker::{FeedRanker, RankedFeed, RankerConfig};
use crate::ring::DEFAULT_VIRTUAL_NODES;
use crate::shard::{ShardConfig, ShardManager};
use crate::store::DataAccessLayer;

/// Default page size for feed requests
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Value-cache entries in the data access layer
    pub cache_capacity: usize,
    /// Assembled feeds kept in the feed-level cache
    pub feed_cache_capacity: usize,
    /// Virtual nodes per partition on the ring
    pub virtual_nodes: usize,
    /// Feed page size when the caller does not specify one
    pub default_page_size: usize,
    pub ranker: RankerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            feed_cache_capacity: DEFAULT_FEED_CACHE_CAPACITY,
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            default_page_size: DEFAULT_PAGE_SIZE,
            ranker: RankerConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(Error::Config("page size must be positive".to_string()));
        }
        self.ranker.validate()
    }
}

/// A cached feed plus whether its assembly was clipped by the page size.
///
/// `exhaustive` means the assembly produced fewer posts than its page could
/// hold, so the list is the user's entire feed and serves any page size.
#[derive(Debug, Clone)]
struct CachedFeed {
    posts: Vec<crate::domain::PostId>,
    exhaustive: bool,
}

/// The assembled access layer.
pub struct FeedService {
    shards: Arc<ShardManager>,
    store: Arc<DataAccessLayer>,
    ranker: FeedRanker,
    feed_cache: LruCache<UserId, CachedFeed>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<AccessMetrics>,
    config: ServiceConfig,
}

impl FeedService {
    pub fn new(
        config: ServiceConfig,
        backend: Arc<dyn StorageBackend>,
        graph: Arc<dyn SocialGraph>,
        content: Arc<dyn ContentStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        let metrics = Arc::new(AccessMetrics::new());
        let shards = Arc::new(ShardManager::new(config.virtual_nodes)?);
        let store = Arc::new(DataAccessLayer::new(
            shards.clone(),
            backend,
            config.cache_capacity,
            metrics.clone(),
        )?);
        Self::from_parts(config, shards, store, metrics, graph, content, events)
    }

    /// Assemble from pre-built parts.
    ///
    /// Used when the content store itself rides on the data access layer and
    /// both must share one shard manager.
    pub fn from_parts(
        config: ServiceConfig,
        shards: Arc<ShardManager>,
        store: Arc<DataAccessLayer>,
        metrics: Arc<AccessMetrics>,
        graph: Arc<dyn SocialGraph>,
        content: Arc<dyn ContentStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        config.validate()?;

        let ranker = FeedRanker::new(graph, content, config.ranker.clone(), metrics.clone())?;
        let feed_cache = LruCache::new(config.feed_cache_capacity)?;

        Ok(Self {
            shards,
            store,
            ranker,
            feed_cache,
            events,
            metrics,
            config,
        })
    }

    // =========================================================================
    // Topology
    // =========================================================================

    /// Register a shard and announce it.
    pub async fn add_shard(&self, config: ShardConfig) -> Result<()> {
        let event = DomainEvent::shard_added(
            &config.partition_id,
            &config.region,
            config.pool_capacity,
        );
        self.shards.add_shard(config)?;
        self.events.publish(event).await
    }

    /// Remove a shard and announce it.
    pub async fn remove_shard(&self, partition_id: &str) -> Result<()> {
        self.shards.remove_shard(partition_id)?;
        self.events
            .publish(DomainEvent::shard_removed(partition_id))
            .await
    }

    /// Activate or drain a shard.
    pub async fn set_shard_active(&self, partition_id: &str, active: bool) -> Result<()> {
        self.shards.set_active(partition_id, active)?;
        if !active {
            self.events
                .publish(DomainEvent::ShardDeactivated {
                    partition_id: partition_id.to_string(),
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Feeds
    // =========================================================================

    /// Serve a feed page for `user`, from the feed cache when possible.
    pub async fn feed(&self, user: &UserId, page_size: usize) -> Result<RankedFeed> {
        if let Some(cached) = self.feed_cache.get(user) {
            if cached.posts.len() >= page_size || cached.exhaustive {
                self.metrics.record_feed_cache_hit();
                debug!(user = %user, "Feed served from cache");
                let mut posts = cached.posts;
                posts.truncate(page_size);
                let feed = RankedFeed::cached(posts);
                self.publish_assembled(user, &feed).await?;
                return Ok(feed);
            }
            // Cached entry was clipped by a smaller page: reassemble
        }
        self.metrics.record_feed_cache_miss();

        let feed = self.ranker.assemble(user, page_size, Utc::now()).await?;

        // Partial feeds are never cached; the next request retries the
        // failed fetches instead of pinning a degraded page
        if !feed.partial {
            self.feed_cache.put(
                user.clone(),
                CachedFeed {
                    posts: feed.posts.clone(),
                    exhaustive: feed.posts.len() < page_size,
                },
            );
        }

        self.publish_assembled(user, &feed).await?;
        Ok(feed)
    }

    /// Serve a feed page of the configured default size.
    pub async fn default_feed(&self, user: &UserId) -> Result<RankedFeed> {
        self.feed(user, self.config.default_page_size).await
    }

    /// Drop a user's cached feed.
    pub async fn invalidate_feed(&self, user: &UserId) -> Result<bool> {
        let dropped = self.feed_cache.invalidate(user).is_some();
        if dropped {
            info!(user = %user, "Feed cache invalidated");
            self.events
                .publish(DomainEvent::FeedInvalidated {
                    user_id: user.to_string(),
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(dropped)
    }

    async fn publish_assembled(&self, user: &UserId, feed: &RankedFeed) -> Result<()> {
        self.events
            .publish(DomainEvent::FeedAssembled {
                user_id: user.to_string(),
                post_count: feed.posts.len(),
                partial: feed.partial,
                from_cache: feed.from_cache,
                timestamp: Utc::now(),
            })
            .await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &Arc<DataAccessLayer> {
        &self.store
    }

    pub fn shards(&self) -> &Arc<ShardManager> {
        &self.shards
    }

    pub fn metrics(&self) -> &Arc<AccessMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn feed_cache_stats(&self) -> CacheStats {
        self.feed_cache.stats()
    }
}

// =============================================================================
// Tests
// =============================================================================
