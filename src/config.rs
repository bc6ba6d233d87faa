use std::path::PathBuf;

use chrono::Duration;
use tracing::warn;

use crate::scheduler::FirePolicy;
use crate::storage::FileStore;

/// Default interval between scheduler ticks (seconds).
pub const DEFAULT_TICK_SECS: i64 = 60;

/// Default lifetime of a dedup marker (seconds).
pub const DEFAULT_MARKER_TTL_SECS: i64 = 3600;

/// Default display duration handed to the notification sink.
pub const DEFAULT_NOTIFICATION_MS: u64 = 10_000;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the file-backed store.
    pub db_path: PathBuf,
    /// Interval between scheduler ticks.
    pub tick_interval: Duration,
    /// Lifetime of a dedup marker, measured from fire time.
    pub marker_ttl: Duration,
    /// Display duration passed to the sink with every notification.
    pub notification_duration_ms: u64,
    pub fire_policy: FirePolicy,
    /// Seed sample tasks when no task collection has ever been stored.
    pub seed_sample_tasks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: FileStore::default_path(),
            tick_interval: Duration::seconds(DEFAULT_TICK_SECS),
            marker_ttl: Duration::seconds(DEFAULT_MARKER_TTL_SECS),
            notification_duration_ms: DEFAULT_NOTIFICATION_MS,
            fire_policy: FirePolicy::ExactMinute,
            seed_sample_tasks: true,
        }
    }
}

impl Config {
    /// Defaults overridden by `REMINDERS_DB`, `REMINDERS_TICK_SECS` and
    /// `REMINDERS_FIRE_POLICY`. Unusable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("REMINDERS_TICK_SECS") {
            match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => config.tick_interval = Duration::seconds(secs),
                _ => warn!("ignoring invalid REMINDERS_TICK_SECS '{raw}'"),
            }
        }

        if let Ok(raw) = std::env::var("REMINDERS_FIRE_POLICY") {
            match raw.parse::<FirePolicy>() {
                Ok(policy) => config.fire_policy = policy,
                Err(e) => warn!("ignoring REMINDERS_FIRE_POLICY: {e}"),
            }
        }

        config
    }

    pub fn with_fire_policy(mut self, policy: FirePolicy) -> Self {
        self.fire_policy = policy;
        self
    }

    pub fn without_sample_tasks(mut self) -> Self {
        self.seed_sample_tasks = false;
        self
    }
}
