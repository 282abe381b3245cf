//! Property-Based Tests for the LRU Cache
//!
//! Uses proptest to verify the cache against a naive reference model across
//! arbitrary operation sequences.
//!
//! # Test Properties
//!
//! 1. **Model Equivalence**: every get/put/invalidate observes the same
//!    values as a list-backed reference implementation
//! 2. **Capacity Bound**: the cache never holds more than `capacity` entries
//! 3. **Eviction Order**: the entry evicted on overflow is always the least
//!    recently touched one

#![cfg(test)]

use proptest::prelude::*;

use super::lru::LruCache;

// =============================================================================
// Reference Model
// =============================================================================

/// Naive LRU model: most-recently-used entry at the front.
struct ModelLru {
    capacity: usize,
    entries: Vec<(u8, u32)>,
}

impl ModelLru {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(pos);
        let value = entry.1;
        self.entries.insert(0, entry);
        Some(value)
    }

    fn put(&mut self, key: u8, value: u32) -> Option<(u8, u32)> {
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(pos);
            self.entries.insert(0, (key, value));
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop()
        } else {
            None
        };
        self.entries.insert(0, (key, value));
        evicted
    }

    fn invalidate(&mut self, key: u8) -> Option<u32> {
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    fn lru_key(&self) -> Option<u8> {
        self.entries.last().map(|(k, _)| *k)
    }
}

// =============================================================================
// Operation Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Get(u8),
    Put(u8, u32),
    Invalidate(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..32).prop_map(Op::Get),
        ((0u8..32), any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        (0u8..32).prop_map(Op::Invalidate),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..200)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_matches_reference_model(capacity in 1usize..16, ops in ops_strategy()) {
        let cache: LruCache<u8, u32> = LruCache::new(capacity).unwrap();
        let mut model = ModelLru::new(capacity);

        for op in ops {
            match op {
                Op::Get(k) => {
                    prop_assert_eq!(cache.get(&k), model.get(k));
                }
                Op::Put(k, v) => {
                    prop_assert_eq!(cache.put(k, v), model.put(k, v));
                }
                Op::Invalidate(k) => {
                    prop_assert_eq!(cache.invalidate(&k), model.invalidate(k));
                }
            }

            prop_assert_eq!(cache.len(), model.entries.len());
            prop_assert_eq!(cache.peek_lru(), model.lru_key());
        }

        cache.assert_invariants();
    }

    #[test]
    fn prop_capacity_never_exceeded(capacity in 1usize..8, ops in ops_strategy()) {
        let cache: LruCache<u8, u32> = LruCache::new(capacity).unwrap();

        for op in ops {
            match op {
                Op::Get(k) => {
                    cache.get(&k);
                }
                Op::Put(k, v) => {
                    cache.put(k, v);
                }
                Op::Invalidate(k) => {
                    cache.invalidate(&k);
                }
            }
            prop_assert!(cache.len() <= capacity);
        }
    }

    #[test]
    fn prop_eviction_is_lru(capacity in 1usize..8, keys in prop::collection::vec(0u8..32, 1..100)) {
        let cache: LruCache<u8, u32> = LruCache::new(capacity).unwrap();

        for (i, key) in keys.into_iter().enumerate() {
            let expected = if cache.len() >= capacity && !cache.contains(&key) {
                cache.peek_lru()
            } else {
                None
            };

            let evicted = cache.put(key, i as u32);
            prop_assert_eq!(evicted.map(|(k, _)| k), expected);
        }
    }
}
