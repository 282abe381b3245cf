//! Access Metrics
//!
//! Process-wide counters for cache, backend, and feed activity. Counters are
//! plain atomics bumped on the hot path; the snapshot derives ratios for the
//! health checker and the Prometheus exporter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared across the access layer.
#[derive(Debug, Default)]
pub struct AccessMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    feed_cache_hits: AtomicU64,
    feed_cache_misses: AtomicU64,
    backend_reads: AtomicU64,
    backend_writes: AtomicU64,
    backend_failures: AtomicU64,
    invalidations: AtomicU64,
    feeds_assembled: AtomicU64,
    partial_feeds: AtomicU64,
    posts_scored: AtomicU64,
}

impl AccessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feed_cache_hit(&self) {
        self.feed_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feed_cache_miss(&self) {
        self.feed_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_read(&self) {
        self.backend_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_write(&self) {
        self.backend_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feed_assembled(&self, partial: bool, posts_scored: u64) {
        self.feeds_assembled.fetch_add(1, Ordering::Relaxed);
        if partial {
            self.partial_feeds.fetch_add(1, Ordering::Relaxed);
        }
        self.posts_scored.fetch_add(posts_scored, Ordering::Relaxed);
    }

    /// Get a consistent-enough snapshot of all counters.
    ///
    /// Counters are read individually; a snapshot taken under load may be
    /// skewed by in-flight increments, which is acceptable for monitoring.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let feed_cache_hits = self.feed_cache_hits.load(Ordering::Relaxed);
        let feed_cache_misses = self.feed_cache_misses.load(Ordering::Relaxed);

        MetricsSnapshot {
            cache_hits,
            cache_misses,
            cache_hit_ratio: ratio(cache_hits, cache_misses),
            feed_cache_hits,
            feed_cache_misses,
            feed_cache_hit_ratio: ratio(feed_cache_hits, feed_cache_misses),
            backend_reads: self.backend_reads.load(Ordering::Relaxed),
            backend_writes: self.backend_writes.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            feeds_assembled: self.feeds_assembled.load(Ordering::Relaxed),
            partial_feeds: self.partial_feeds.load(Ordering::Relaxed),
            posts_scored: self.posts_scored.load(Ordering::Relaxed),
        }
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Point-in-time view of the access counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub feed_cache_hits: u64,
    pub feed_cache_misses: u64,
    pub feed_cache_hit_ratio: f64,
    pub backend_reads: u64,
    pub backend_writes: u64,
    pub backend_failures: u64,
    pub invalidations: u64,
    pub feeds_assembled: u64,
    pub partial_feeds: u64,
    pub posts_scored: u64,
}

impl MetricsSnapshot {
    /// Total lookups against the value cache.
    pub fn cache_lookups(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_metrics_are_zero() {
        let snapshot = AccessMetrics::new().snapshot();
        assert_eq!(snapshot.cache_lookups(), 0);
        assert_eq!(snapshot.cache_hit_ratio, 0.0);
        assert_eq!(snapshot.backend_failures, 0);
        assert_eq!(snapshot.feeds_assembled, 0);
    }

    #[test]
    fn test_hit_ratio_derivation() {
        let metrics = AccessMetrics::new();
        for _ in 0..3 {
            metrics.record_cache_hit();
        }
        metrics.record_cache_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 3);
        assert_eq!(snapshot.cache_misses, 1);
        assert!((snapshot.cache_hit_ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feed_assembly_counters() {
        let metrics = AccessMetrics::new();
        metrics.record_feed_assembled(false, 40);
        metrics.record_feed_assembled(true, 12);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.feeds_assembled, 2);
        assert_eq!(snapshot.partial_feeds, 1);
        assert_eq!(snapshot.posts_scored, 52);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(AccessMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_cache_hit();
                        metrics.record_backend_read();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 4000);
        assert_eq!(snapshot.backend_reads, 4000);
    }
}
