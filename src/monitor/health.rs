//! Health Model
//!
//! Status types produced by the periodic health checker and exposed over
//! the health endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a checked component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component operating normally
    Healthy,
    /// Component operational with reduced capability
    Degraded,
    /// Component not operational
    Unhealthy,
}

impl HealthStatus {
    /// The worse of two statuses.
    pub fn worst(self, other: Self) -> Self {
        use HealthStatus::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of one component check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub component: String,
    pub status: HealthStatus,
    pub message: String,
}

impl HealthCheckResult {
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: "ok".to_string(),
        }
    }

    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            message: message.into(),
        }
    }

    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: message.into(),
        }
    }
}

/// Aggregated report for one check cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst status across all checks
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Aggregate individual checks into a report; no checks means healthy.
    pub fn from_checks(checks: Vec<HealthCheckResult>, uptime_seconds: u64) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Self {
            status,
            checks,
            uptime_seconds,
            timestamp: Utc::now(),
        }
    }

    /// Messages of every non-healthy check, for alert delivery.
    pub fn alerts(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| !c.status.is_healthy())
            .map(|c| format!("{}: {} ({})", c.component, c.message, c.status))
            .collect()
    }
}
