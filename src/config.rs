//! Subscriber tuning.
//!
//! [`SubscriberConfig::default`] carries the fixed buffer sizes and retry
//! delay the subscriber is designed around. The builders exist for tests and
//! embedding.

use std::time::Duration;

/// Pending subscription requests held before `subscribe` blocks the caller.
pub const SUBSCRIPTION_QUEUE_DEPTH: usize = 5;

/// Received messages held before the delivery worker stops reading.
pub const MESSAGE_CHANNEL_DEPTH: usize = 20;

/// Wait between attempts to subscribe to an unreachable publisher.
pub const SUBSCRIBE_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub queue_capacity: usize,
    pub message_capacity: usize,
    /// Fixed delay between subscribe retries and after a failed read.
    pub retry_delay: Duration,
    /// Timeout for the handshake callback POST. `None` leaves it to the
    /// HTTP client's socket defaults.
    pub callback_timeout: Option<Duration>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            queue_capacity: SUBSCRIPTION_QUEUE_DEPTH,
            message_capacity: MESSAGE_CHANNEL_DEPTH,
            retry_delay: SUBSCRIBE_RETRY_DELAY,
            callback_timeout: None,
        }
    }
}

impl SubscriberConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_message_capacity(mut self, capacity: usize) -> Self {
        self.message_capacity = capacity;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }
}
