//! LRU Cache Implementation
//!
//! Generic bounded cache with least-recently-used eviction.
//!
//! # Design
//!
//! The recency order is a doubly-linked list threaded through a contiguous
//! slot arena, with links stored as integer indices. A `HashMap` maps keys to
//! slot indices. Freed slots are recycled through a free list, so the arena
//! never exceeds `capacity` slots.
//!
//! Invariant: the lookup index and the recency list are always mutually
//! consistent. The most-recently-touched key is at the head; the tail is the
//! next eviction candidate. A broken invariant is a programming error and
//! panics rather than being silently tolerated.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Sentinel index for "no slot"
const NIL: usize = usize::MAX;

/// A slot in the arena: one cache entry plus its recency links.
struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Arena, recency links, and lookup index. Guarded by one mutex.
struct LruState<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: usize,
    tail: usize,
}

impl<K: Eq + Hash + Clone, V> LruState<K, V> {
    fn slot(&self, idx: usize) -> &Slot<K, V> {
        self.slots[idx].as_ref().expect("lru slot table corrupted")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot<K, V> {
        self.slots[idx].as_mut().expect("lru slot table corrupted")
    }

    /// Detach a slot from the recency list without freeing it.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };

        if prev != NIL {
            self.slot_mut(prev).next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.slot_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    /// Attach a slot at the head (most recently used).
    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(idx);
            slot.prev = NIL;
            slot.next = old_head;
        }

        if old_head != NIL {
            self.slot_mut(old_head).prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    /// Move an existing slot to the head.
    fn touch(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    /// Remove the tail entry, returning its key and value.
    fn pop_tail(&mut self) -> Option<(K, V)> {
        let idx = self.tail;
        if idx == NIL {
            return None;
        }
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("lru slot table corrupted");
        self.free.push(idx);
        self.index.remove(&slot.key);
        Some((slot.key, slot.value))
    }

    /// Allocate a slot for a new entry and link it at the head.
    fn insert_front(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                debug_assert!(self.slots[idx].is_none());
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        self.push_front(idx);
        self.index.insert(key, idx);
        idx
    }

    fn occupied(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Bounded cache with least-recently-used eviction.
///
/// `get` and `put` are O(1) expected. All operations on the same key from
/// different threads are linearized by the internal lock.
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    insertions: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Create a new cache with the given capacity (in entries).
    ///
    /// Non-positive capacity is a configuration error raised here, never at
    /// call time.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config(
                "cache capacity must be positive".to_string(),
            ));
        }

        Ok(Self {
            state: Mutex::new(LruState {
                slots: Vec::with_capacity(capacity),
                free: Vec::new(),
                index: HashMap::with_capacity(capacity),
                head: NIL,
                tail: NIL,
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        })
    }

    /// Get a value, marking the key most-recently-used on hit.
    ///
    /// Never errors: a miss is an ordinary `None`.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();

        let idx = match state.index.get(key) {
            Some(&idx) => idx,
            None => {
                drop(state);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        state.touch(idx);
        let value = state.slot(idx).value.clone();
        drop(state);

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    /// Insert or overwrite a value, marking the key most-recently-used.
    ///
    /// When inserting a new key at capacity, the least-recently-used entry is
    /// evicted first and returned. Overwriting an existing key never evicts.
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        let mut state = self.state.lock();

        if let Some(&idx) = state.index.get(&key) {
            state.slot_mut(idx).value = value;
            state.touch(idx);
            debug_assert_eq!(state.index.len(), state.occupied());
            return None;
        }

        let evicted = if state.index.len() >= self.capacity {
            state.pop_tail()
        } else {
            None
        };

        state.insert_front(key, value);
        debug_assert_eq!(state.index.len(), state.occupied());
        drop(state);

        self.insertions.fetch_add(1, Ordering::Relaxed);
        if evicted.is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Explicitly remove a key, returning its value if present.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();

        let idx = state.index.remove(key)?;
        state.unlink(idx);
        let slot = state.slots[idx].take().expect("lru slot table corrupted");
        state.free.push(idx);
        debug_assert_eq!(state.index.len(), state.occupied());
        Some(slot.value)
    }

    /// Check presence without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().index.contains_key(key)
    }

    /// Key of the current eviction candidate (least recently used).
    pub fn peek_lru(&self) -> Option<K> {
        let state = self.state.lock();
        if state.tail == NIL {
            return None;
        }
        Some(state.slot(state.tail).key.clone())
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all entries. Counters are preserved.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.slots.clear();
        state.free.clear();
        state.index.clear();
        state.head = NIL;
        state.tail = NIL;
    }

    /// Hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Eviction count.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Hit ratio (0.0 - 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Get a statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            insertions: self.insertions.load(Ordering::Relaxed),
            hit_ratio: self.hit_ratio(),
        }
    }

    /// Verify internal consistency. Panics on a broken invariant.
    #[cfg(test)]
    pub fn assert_invariants(&self) {
        let state = self.state.lock();

        // Index and arena agree on entry count
        assert_eq!(state.index.len(), state.occupied());

        // Walk the list forward and count
        let mut count = 0;
        let mut idx = state.head;
        let mut last = NIL;
        while idx != NIL {
            let slot = state.slot(idx);
            assert_eq!(slot.prev, last);
            assert_eq!(state.index.get(&slot.key), Some(&idx));
            last = idx;
            idx = slot.next;
            count += 1;
        }
        assert_eq!(state.tail, last);
        assert_eq!(count, state.index.len());
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries
    pub entries: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Hit count
    pub hits: u64,
    /// Miss count
    pub misses: u64,
    /// Eviction count
    pub evictions: u64,
    /// Insertion count (new keys only)
    pub insertions: u64,
    /// Hit ratio (0.0 - 1.0)
    pub hit_ratio: f64,
}

// =============================================================================
// Tests
// =============================================================================
