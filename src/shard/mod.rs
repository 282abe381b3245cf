//! Shard Manager
//!
//! Composes the hash ring with one connection pool per partition: routes a
//! key to its partition and lends out a connection handle.
//!
//! # Concurrency
//!
//! - The ring sits behind a read-write lock; topology changes take the write
//!   lock, so an in-flight lookup sees the ring fully before or fully after
//!   a change, never a partial update
//! - The partition map is a `DashMap` shared across callers; each pool's
//!   free/active sets are contended only by callers targeting that partition
//! - The ring lock is dropped before any pool is touched, and no lock is
//!   held across backend I/O (the data access layer releases handles after
//!   its await points)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pool::{ConnectionHandle, ConnectionPool, PoolStats};
use crate::ring::HashRing;

/// Configuration for one shard (partition + pool).
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// Partition identifier, unique across the manager
    pub partition_id: String,
    /// Operator-facing placement label
    pub region: String,
    /// Connection handles for this partition's pool
    pub pool_capacity: usize,
}

impl ShardConfig {
    pub fn new(
        partition_id: impl Into<String>,
        region: impl Into<String>,
        pool_capacity: usize,
    ) -> Self {
        Self {
            partition_id: partition_id.into(),
            region: region.into(),
            pool_capacity,
        }
    }
}

/// Live state for one partition.
struct PartitionState {
    region: String,
    active: AtomicBool,
    pool: ConnectionPool,
}

/// Routes keys to partitions and lends out pooled connections.
pub struct ShardManager {
    ring: RwLock<HashRing>,
    partitions: DashMap<String, Arc<PartitionState>>,
}

impl ShardManager {
    /// Create a manager with no shards.
    ///
    /// A zero virtual-node count is a configuration error.
    pub fn new(virtual_nodes: usize) -> Result<Self> {
        Ok(Self {
            ring: RwLock::new(HashRing::new(virtual_nodes)?),
            partitions: DashMap::new(),
        })
    }

    /// Register a partition: create its pool, then add it to the ring.
    ///
    /// The existence check and the insert are one atomic entry operation, so
    /// concurrent adds of the same id leave exactly one pool standing.
    pub fn add_shard(&self, config: ShardConfig) -> Result<()> {
        match self.partitions.entry(config.partition_id.clone()) {
            Entry::Occupied(_) => return Err(Error::PartitionExists(config.partition_id)),
            Entry::Vacant(slot) => {
                let pool =
                    ConnectionPool::new(config.partition_id.clone(), config.pool_capacity)?;
                slot.insert(Arc::new(PartitionState {
                    region: config.region.clone(),
                    active: AtomicBool::new(true),
                    pool,
                }));
            }
        }

        self.ring.write().add_partition(&config.partition_id);

        info!(
            partition = %config.partition_id,
            region = %config.region,
            pool_capacity = config.pool_capacity,
            "Shard added"
        );
        Ok(())
    }

    /// Remove a partition from the ring and destroy its pool.
    ///
    /// Key migration off the partition is an operational step performed
    /// before removal; it is not enforced here.
    pub fn remove_shard(&self, partition_id: &str) -> Result<()> {
        self.ring.write().remove_partition(partition_id);

        match self.partitions.remove(partition_id) {
            Some(_) => {
                info!(partition = %partition_id, "Shard removed");
                Ok(())
            }
            None => Err(Error::PartitionNotFound(partition_id.to_string())),
        }
    }

    /// Mark a partition active or inactive (draining).
    pub fn set_active(&self, partition_id: &str, active: bool) -> Result<()> {
        let state = self
            .partitions
            .get(partition_id)
            .ok_or_else(|| Error::PartitionNotFound(partition_id.to_string()))?;

        state.active.store(active, Ordering::Release);
        info!(partition = %partition_id, active, "Shard activation changed");
        Ok(())
    }

    /// Map a key to its owning partition without acquiring a connection.
    pub fn route(&self, key: &str) -> Result<String> {
        self.ring
            .read()
            .lookup(key)
            .map(str::to_string)
            .ok_or(Error::RingEmpty)
    }

    /// Route a key and acquire a connection from its partition's pool.
    ///
    /// Fails with a typed error when the ring is empty, the partition is
    /// inactive, or its pool is exhausted. The ring lock is released before
    /// the pool is touched.
    pub fn route_and_acquire(&self, key: &str) -> Result<(String, ConnectionHandle)> {
        let partition_id = self.route(key)?;

        let state = self
            .partitions
            .get(&partition_id)
            .ok_or_else(|| Error::PartitionNotFound(partition_id.clone()))?
            .clone();

        if !state.active.load(Ordering::Acquire) {
            return Err(Error::PartitionInactive(partition_id));
        }

        let handle = state.pool.acquire()?;
        debug!(partition = %partition_id, handle = %handle, key, "Connection acquired");
        Ok((partition_id, handle))
    }

    /// Return a handle to its partition's pool.
    pub fn release(&self, partition_id: &str, handle: ConnectionHandle) -> Result<()> {
        let state = self
            .partitions
            .get(partition_id)
            .ok_or_else(|| Error::PartitionNotFound(partition_id.to_string()))?;

        state.pool.release(handle);
        Ok(())
    }

    /// Registered partition ids, sorted.
    pub fn partition_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.partitions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Region label of a partition.
    pub fn region(&self, partition_id: &str) -> Option<String> {
        self.partitions.get(partition_id).map(|s| s.region.clone())
    }

    /// Whether a partition is accepting traffic.
    pub fn is_active(&self, partition_id: &str) -> bool {
        self.partitions
            .get(partition_id)
            .map(|s| s.active.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Pool statistics for every partition, sorted by partition id.
    pub fn pool_stats(&self) -> Vec<PoolStats> {
        let mut stats: Vec<PoolStats> = self
            .partitions
            .iter()
            .map(|entry| entry.value().pool.stats())
            .collect();
        stats.sort_by(|a, b| a.partition.cmp(&b.partition));
        stats
    }
}

// =============================================================================
// Tests
// =============================================================================
