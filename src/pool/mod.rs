//! Partition Connection Pool
//!
//! Bounded pool of reusable connection handles for one storage partition.
//!
//! # Design
//!
//! - All handles are created at construction time in fixed quantity and
//!   recycled until pool shutdown, never garbage-created ad hoc
//! - `acquire` never blocks: an exhausted pool is a typed result, and
//!   blocking-with-timeout is a caller-level policy choice
//! - Releasing a handle the pool does not consider active is a logged no-op
//! - Invariant: |free| + |active| == capacity at all times; a handle is never
//!   in both sets at once

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default handles per partition pool
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// Opaque connection handle.
///
/// Owned exclusively by at most one caller at any instant; returned to its
/// pool's free set on release. A caller that abandons a handle without
/// releasing it leaks pool capacity — a documented caller obligation, not a
/// core-internal safety net.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    id: Uuid,
}

impl ConnectionHandle {
    fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// Opaque identifier, for logging only.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.id)
    }
}

/// Free and active handle sets. Guarded by one mutex.
struct PoolState {
    free: Vec<ConnectionHandle>,
    active: HashSet<ConnectionHandle>,
}

/// Bounded connection pool for a single partition.
pub struct ConnectionPool {
    partition: String,
    capacity: usize,
    state: Mutex<PoolState>,
    acquires: AtomicU64,
    releases: AtomicU64,
    exhaustions: AtomicU64,
    foreign_releases: AtomicU64,
}

impl ConnectionPool {
    /// Create a pool with `capacity` pre-created handles.
    ///
    /// Non-positive capacity is a configuration error raised here.
    pub fn new(partition: impl Into<String>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config(
                "pool capacity must be positive".to_string(),
            ));
        }

        let free = (0..capacity).map(|_| ConnectionHandle::new()).collect();

        Ok(Self {
            partition: partition.into(),
            capacity,
            state: Mutex::new(PoolState {
                free,
                active: HashSet::with_capacity(capacity),
            }),
            acquires: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            exhaustions: AtomicU64::new(0),
            foreign_releases: AtomicU64::new(0),
        })
    }

    /// Take a handle from the free set.
    ///
    /// Returns `Error::PoolExhausted` when no handle is free; never blocks.
    pub fn acquire(&self) -> Result<ConnectionHandle> {
        let mut state = self.state.lock();

        let handle = match state.free.pop() {
            Some(handle) => handle,
            None => {
                drop(state);
                self.exhaustions.fetch_add(1, Ordering::Relaxed);
                return Err(Error::PoolExhausted {
                    partition: self.partition.clone(),
                });
            }
        };

        state.active.insert(handle.clone());
        debug_assert_eq!(state.free.len() + state.active.len(), self.capacity);
        drop(state);

        self.acquires.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Return a previously acquired handle to the free set.
    ///
    /// A handle the pool does not consider active is ignored with a warning
    /// rather than corrupting the free set.
    pub fn release(&self, handle: ConnectionHandle) {
        let mut state = self.state.lock();

        if state.active.remove(&handle) {
            state.free.push(handle);
            debug_assert_eq!(state.free.len() + state.active.len(), self.capacity);
            drop(state);
            self.releases.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(state);
            self.foreign_releases.fetch_add(1, Ordering::Relaxed);
            warn!(
                partition = %self.partition,
                handle = %handle,
                "Release of a handle not held by this pool, ignoring"
            );
        }
    }

    /// Partition this pool belongs to.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free handles.
    pub fn available(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Number of handles currently lent out.
    pub fn in_use(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Fraction of capacity currently lent out (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        self.in_use() as f64 / self.capacity as f64
    }

    /// Get a statistics snapshot.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            partition: self.partition.clone(),
            capacity: self.capacity,
            available: state.free.len(),
            in_use: state.active.len(),
            acquires: self.acquires.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
            foreign_releases: self.foreign_releases.load(Ordering::Relaxed),
        }
    }
}

/// Pool statistics snapshot
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Owning partition id
    pub partition: String,
    /// Configured capacity
    pub capacity: usize,
    /// Free handles
    pub available: usize,
    /// Handles currently lent out
    pub in_use: usize,
    /// Successful acquires
    pub acquires: u64,
    /// Successful releases
    pub releases: u64,
    /// Acquire attempts that found the pool exhausted
    pub exhaustions: u64,
    /// Releases of handles not held by this pool
    pub foreign_releases: u64,
}

// =============================================================================
// Tests
// =============================================================================
