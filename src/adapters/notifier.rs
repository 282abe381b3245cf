//! Alert Channels
//!
//! Delivery targets for health alerts. A channel is data, not a trait
//! object: variants carry their own routing details, and delivery is one
//! match. The `Memory` variant captures messages for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Where a health alert goes.
#[derive(Debug, Clone)]
pub enum AlertChannel {
    /// Structured log line at warn level
    Log,
    /// Email delivery (logged; SMTP wiring is deployment-specific)
    Email { recipient: String },
    /// Chat webhook delivery (logged; HTTP wiring is deployment-specific)
    Chat { webhook: String },
    /// In-memory capture for tests
    Memory(Arc<Mutex<Vec<String>>>),
}

impl AlertChannel {
    /// In-memory channel plus a handle to its captured messages.
    pub fn memory() -> (Self, Arc<Mutex<Vec<String>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        (Self::Memory(sink.clone()), sink)
    }

    /// Deliver one alert message.
    pub fn deliver(&self, message: &str) {
        match self {
            Self::Log => {
                warn!(alert = %message, "Health alert");
            }
            Self::Email { recipient } => {
                error!(recipient = %recipient, alert = %message, "Health alert (email)");
            }
            Self::Chat { webhook } => {
                info!(webhook = %webhook, alert = %message, "Health alert (chat)");
            }
            Self::Memory(sink) => {
                sink.lock().push(message.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_channel_captures() {
        let (channel, sink) = AlertChannel::memory();

        channel.deliver("cache hit ratio below threshold");
        channel.deliver("pool saturated");

        let captured = sink.lock();
        assert_eq!(captured.len(), 2);
        assert!(captured[0].contains("hit ratio"));
    }

    #[test]
    fn test_logging_channels_do_not_panic() {
        AlertChannel::Log.deliver("msg");
        AlertChannel::Email {
            recipient: "ops@example.com".to_string(),
        }
        .deliver("msg");
        AlertChannel::Chat {
            webhook: "https://chat.example.com/hook".to_string(),
        }
        .deliver("msg");
    }
}
