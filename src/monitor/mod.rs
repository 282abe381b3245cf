//! System Health Monitoring
//!
//! Periodic checks over the shard topology, the connection pools, and the
//! cache, with alert delivery to configured channels.
//!
//! The check itself (`on_tick`) is a pure function of current state so tests
//! can drive it directly; the `run` loop only adds scheduling and shutdown.

mod health;

pub use health::{HealthCheckResult, HealthReport, HealthStatus};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::AlertChannel;
use crate::metrics::AccessMetrics;
use crate::shard::ShardManager;

/// Thresholds that separate healthy from degraded.
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    /// Cache hit ratio below this is degraded
    pub min_hit_ratio: f64,
    /// Pool utilization at or above this is degraded
    pub max_pool_utilization: f64,
    /// Hit ratio is not judged until this many cache lookups have happened
    pub min_samples: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            min_hit_ratio: 0.5,
            max_pool_utilization: 0.9,
            min_samples: 100,
        }
    }
}

/// Periodic health checker over the access layer.
pub struct SystemHealthChecker {
    shards: Arc<ShardManager>,
    metrics: Arc<AccessMetrics>,
    thresholds: HealthThresholds,
    channels: Vec<AlertChannel>,
    started: Instant,
}

impl SystemHealthChecker {
    pub fn new(
        shards: Arc<ShardManager>,
        metrics: Arc<AccessMetrics>,
        thresholds: HealthThresholds,
        channels: Vec<AlertChannel>,
    ) -> Self {
        Self {
            shards,
            metrics,
            thresholds,
            channels,
            started: Instant::now(),
        }
    }

    /// Run one check cycle and produce a report. No side effects.
    pub fn on_tick(&self) -> HealthReport {
        let mut checks = Vec::new();

        // Topology: an empty ring serves nothing
        if self.shards.partition_count() == 0 {
            checks.push(HealthCheckResult::unhealthy(
                "ring",
                "no partitions registered",
            ));
        } else {
            checks.push(HealthCheckResult::healthy("ring"));
        }

        // Pools: saturated pools turn reads into errors
        for stats in self.shards.pool_stats() {
            let utilization = stats.in_use as f64 / stats.capacity as f64;
            let component = format!("pool/{}", stats.partition);
            if utilization >= self.thresholds.max_pool_utilization {
                checks.push(HealthCheckResult::degraded(
                    component,
                    format!(
                        "utilization {:.2} at or above {:.2}",
                        utilization, self.thresholds.max_pool_utilization
                    ),
                ));
            } else {
                checks.push(HealthCheckResult::healthy(component));
            }
        }

        // Cache: only judged once enough lookups have accumulated
        let snapshot = self.metrics.snapshot();
        if snapshot.cache_lookups() >= self.thresholds.min_samples {
            if snapshot.cache_hit_ratio < self.thresholds.min_hit_ratio {
                checks.push(HealthCheckResult::degraded(
                    "cache",
                    format!(
                        "hit ratio {:.2} below {:.2}",
                        snapshot.cache_hit_ratio, self.thresholds.min_hit_ratio
                    ),
                ));
            } else {
                checks.push(HealthCheckResult::healthy("cache"));
            }
        }

        HealthReport::from_checks(checks, self.started.elapsed().as_secs())
    }

    /// Run the check loop until cancelled, delivering alerts for every
    /// non-healthy report.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(interval_secs = interval.as_secs(), "Health checker started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.on_tick();
                    debug!(status = %report.status, checks = report.checks.len(), "Health tick");

                    for alert in report.alerts() {
                        for channel in &self.channels {
                            channel.deliver(&alert);
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Health checker stopping");
                    return;
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::ShardConfig;

    fn checker_fixture(
        shards: &[&str],
        pool_capacity: usize,
        channels: Vec<AlertChannel>,
    ) -> SystemHealthChecker {
        let manager = Arc::new(ShardManager::new(16).unwrap());
        for shard in shards {
            manager
                .add_shard(ShardConfig::new(*shard, "r", pool_capacity))
                .unwrap();
        }
        SystemHealthChecker::new(
            manager,
            Arc::new(AccessMetrics::new()),
            HealthThresholds::default(),
            channels,
        )
    }

    #[test]
    fn test_empty_ring_is_unhealthy() {
        let checker = checker_fixture(&[], 2, Vec::new());
        let report = checker.on_tick();
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_idle_system_is_healthy() {
        let checker = checker_fixture(&["p1", "p2"], 2, Vec::new());
        let report = checker.on_tick();
        assert_eq!(report.status, HealthStatus::Healthy);
        // ring + two pools; cache not judged below min_samples
        assert_eq!(report.checks.len(), 3);
    }

    #[test]
    fn test_saturated_pool_degrades() {
        let checker = checker_fixture(&["only"], 1, Vec::new());

        let (partition, _handle) = checker.shards.route_and_acquire("key").unwrap();
        assert_eq!(partition, "only");

        let report = checker.on_tick();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report
            .alerts()
            .iter()
            .any(|a| a.contains("pool/only")));
    }

    #[test]
    fn test_low_hit_ratio_degrades_after_min_samples() {
        let checker = checker_fixture(&["p1"], 2, Vec::new());

        // 30 hits, 90 misses: ratio 0.25 over 120 samples
        for _ in 0..30 {
            checker.metrics.record_cache_hit();
        }
        for _ in 0..90 {
            checker.metrics.record_cache_miss();
        }

        let report = checker.on_tick();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.alerts().iter().any(|a| a.contains("cache")));
    }

    #[test]
    fn test_hit_ratio_not_judged_below_min_samples() {
        let checker = checker_fixture(&["p1"], 2, Vec::new());

        // 1 hit, 9 misses: terrible ratio but too few samples to matter
        checker.metrics.record_cache_hit();
        for _ in 0..9 {
            checker.metrics.record_cache_miss();
        }

        assert_eq!(checker.on_tick().status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_run_delivers_alerts_and_stops() {
        let (channel, sink) = AlertChannel::memory();
        let checker = Arc::new(checker_fixture(&[], 2, vec![channel]));

        let cancel = CancellationToken::new();
        let task = {
            let checker = checker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                checker.run(Duration::from_millis(10), cancel).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.unwrap();

        // The empty ring produced at least one delivered alert
        assert!(!sink.lock().is_empty());
    }
}
