use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";

// Reference care cadences (classic 5-field cron, UTC).
pub const WATERING_CRON: &str = "0 0 * * *";
pub const SUNLIGHT_CRON: &str = "0 */4 * * *";
pub const HEALTH_CHECK_CRON: &str = "0 * * * *";

pub const FERTILIZER_DELAY_SECS: u64 = 2 * 60 * 60;
pub const NOTIFICATION_DELAY_SECS: u64 = 24 * 60 * 60;

/// Top-level config (sprout.toml + SPROUT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SproutConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub care: CareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Durable job runner tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the engine polls the `jobs` table for due work.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of jobs executing at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Attempts before a one-shot job is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on every further attempt (capped at 1h).
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,
    /// Capacity of the fired-job channel between engine and workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            retry_base_secs: default_retry_base_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Cadences and delays of the plant care jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareConfig {
    #[serde(default = "default_watering_cron")]
    pub watering_cron: String,
    #[serde(default = "default_sunlight_cron")]
    pub sunlight_cron: String,
    #[serde(default = "default_health_check_cron")]
    pub health_check_cron: String,
    #[serde(default = "default_fertilizer_delay_secs")]
    pub fertilizer_delay_secs: u64,
    #[serde(default = "default_notification_delay_secs")]
    pub notification_delay_secs: u64,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self {
            watering_cron: default_watering_cron(),
            sunlight_cron: default_sunlight_cron(),
            health_check_cron: default_health_check_cron(),
            fertilizer_delay_secs: FERTILIZER_DELAY_SECS,
            notification_delay_secs: NOTIFICATION_DELAY_SECS,
        }
    }
}

impl CareConfig {
    pub fn fertilizer_delay(&self) -> Duration {
        Duration::from_secs(self.fertilizer_delay_secs)
    }

    pub fn notification_delay(&self) -> Duration {
        Duration::from_secs(self.notification_delay_secs)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.sprout/sprout.db", home)
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_workers() -> usize {
    4
}
fn default_max_attempts() -> u32 {
    10
}
fn default_retry_base_secs() -> u64 {
    15
}
fn default_queue_capacity() -> usize {
    256
}
fn default_watering_cron() -> String {
    WATERING_CRON.to_string()
}
fn default_sunlight_cron() -> String {
    SUNLIGHT_CRON.to_string()
}
fn default_health_check_cron() -> String {
    HEALTH_CHECK_CRON.to_string()
}
fn default_fertilizer_delay_secs() -> u64 {
    FERTILIZER_DELAY_SECS
}
fn default_notification_delay_secs() -> u64 {
    NOTIFICATION_DELAY_SECS
}

impl SproutConfig {
    /// Load config from a TOML file with SPROUT_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `SPROUT_SCHEDULER__WORKERS=8`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::SproutError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SPROUT_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.sprout/sprout.toml", home)
}
