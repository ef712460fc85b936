use std::time::Duration;

use super::error::{Error, Result};

pub const ELECTION_TIMEOUT_ENV: &str = "BROADCAST_ELECTION_TIMEOUT_MS";
pub const HEARTBEAT_INTERVAL_ENV: &str = "BROADCAST_HEARTBEAT_INTERVAL_MS";
pub const CHECK_INTERVAL_ENV: &str = "BROADCAST_CHECK_INTERVAL_MS";
pub const SEND_TIMEOUT_ENV: &str = "BROADCAST_SEND_TIMEOUT_MS";
pub const MEMBERS_ENV: &str = "BROADCAST_MEMBERS";

/// Timing knobs for the failure detector, election and transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Silence from the leader longer than this triggers an election
    pub election_timeout: Duration,
    /// How often a leader announces itself
    pub heartbeat_interval: Duration,
    /// How often a non-leader checks leader freshness
    pub liveness_check_interval: Duration,
    /// Upper bound on a single send, connect included
    pub send_timeout: Duration,
    /// Capacity of the processor's inbound event channel
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            election_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(1),
            liveness_check_interval: Duration::from_secs(1),
            send_timeout: Duration::from_secs(1),
            channel_capacity: 1024,
        }
    }
}

impl Config {
    /// Defaults overridden by `BROADCAST_*_MS` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(timeout) = millis(&lookup, ELECTION_TIMEOUT_ENV)? {
            config.election_timeout = timeout;
        }
        if let Some(interval) = millis(&lookup, HEARTBEAT_INTERVAL_ENV)? {
            config.heartbeat_interval = interval;
        }
        if let Some(interval) = millis(&lookup, CHECK_INTERVAL_ENV)? {
            config.liveness_check_interval = interval;
        }
        if let Some(timeout) = millis(&lookup, SEND_TIMEOUT_ENV)? {
            config.send_timeout = timeout;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() || self.liveness_check_interval.is_zero() {
            return Err(Error::Config("intervals must be non-zero".into()));
        }
        if self.send_timeout.is_zero() {
            return Err(Error::Config("send timeout must be non-zero".into()));
        }
        if self.heartbeat_interval >= self.election_timeout {
            return Err(Error::Config(format!(
                "heartbeat interval {:?} must be shorter than election timeout {:?}",
                self.heartbeat_interval, self.election_timeout
            )));
        }
        Ok(())
    }
}

fn millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
    }
}
