//! Property-Based Tests for the Hash Ring
//!
//! # Test Properties
//!
//! 1. **Lookup Stability**: the same key always resolves to the same
//!    partition on an unchanged ring
//! 2. **Removal Isolation**: removing a partition never moves a key it did
//!    not own
//! 3. **Addition Isolation**: adding a partition only ever moves keys onto
//!    the new partition

#![cfg(test)]

use proptest::prelude::*;

use super::HashRing;

fn partition_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,8}", 2..6)
        .prop_map(|set| set.into_iter().collect())
}

fn keys() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9:_-]{1,16}", 1..200)
}

proptest! {
    #[test]
    fn prop_lookup_is_stable(partitions in partition_ids(), keys in keys()) {
        let mut ring = HashRing::new(32).unwrap();
        for p in &partitions {
            ring.add_partition(p);
        }

        for key in &keys {
            let first = ring.lookup(key).map(str::to_string);
            prop_assert!(first.is_some());
            prop_assert_eq!(ring.lookup(key).map(str::to_string), first);
        }
    }

    #[test]
    fn prop_removal_moves_only_owned_keys(
        partitions in partition_ids(),
        keys in keys(),
        victim_idx in any::<prop::sample::Index>(),
    ) {
        let mut ring = HashRing::new(32).unwrap();
        for p in &partitions {
            ring.add_partition(p);
        }

        let victim = partitions[victim_idx.index(partitions.len())].clone();
        let before: Vec<String> = keys
            .iter()
            .map(|k| ring.lookup(k).unwrap().to_string())
            .collect();

        ring.remove_partition(&victim);

        for (key, old) in keys.iter().zip(&before) {
            match ring.lookup(key) {
                Some(new) if *old == victim => prop_assert_ne!(new, victim.as_str()),
                Some(new) => prop_assert_eq!(new, old.as_str()),
                None => prop_assert_eq!(partitions.len(), 1),
            }
        }
    }

    #[test]
    fn prop_addition_moves_keys_only_to_new_partition(
        partitions in partition_ids(),
        keys in keys(),
    ) {
        let mut ring = HashRing::new(32).unwrap();
        for p in &partitions {
            ring.add_partition(p);
        }

        let before: Vec<String> = keys
            .iter()
            .map(|k| ring.lookup(k).unwrap().to_string())
            .collect();

        let newcomer = "zz-newcomer";
        prop_assume!(!partitions.iter().any(|p| p == newcomer));
        ring.add_partition(newcomer);

        for (key, old) in keys.iter().zip(&before) {
            let new = ring.lookup(key).unwrap();
            if new != old {
                prop_assert_eq!(new, newcomer);
            }
        }
    }
}
