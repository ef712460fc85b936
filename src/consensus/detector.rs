use std::time::Duration;

use tokio::time::Instant;

/// Tracks how long the believed leader has been silent.
///
/// A single missed heartbeat means nothing; only silence longer than the
/// election timeout does.
#[derive(Debug)]
pub struct FailureDetector {
    timeout: Duration,
    last_heartbeat: Instant,
}

impl FailureDetector {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        FailureDetector {
            timeout,
            last_heartbeat: now,
        }
    }

    pub fn record(&mut self, now: Instant) {
        if now > self.last_heartbeat {
            self.last_heartbeat = now;
        }
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_heartbeat)
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.silence(now) > self.timeout
    }
}
