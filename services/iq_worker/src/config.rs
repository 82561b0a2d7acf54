//! Worker configuration

use std::env;
use std::time::Duration;

pub const DEFAULT_ODDS_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LIVE_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_IQ_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_VERIFICATION_INTERVAL_SECS: u64 = 900;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 6 * 3600;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub odds_interval: Duration,
    pub live_interval: Duration,
    pub iq_interval: Duration,
    pub verification_interval: Duration,
    pub stats_interval: Duration,
    pub cleanup_interval: Duration,
    pub stuck_live_hours: i64,
    pub stats_staleness_hours: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: funbet_core::config::load_database_url(),
            odds_interval: env_secs("ODDS_INTERVAL_SECS", DEFAULT_ODDS_INTERVAL_SECS),
            live_interval: env_secs("LIVE_INTERVAL_SECS", DEFAULT_LIVE_INTERVAL_SECS),
            iq_interval: env_secs("IQ_INTERVAL_SECS", DEFAULT_IQ_INTERVAL_SECS),
            verification_interval: env_secs(
                "VERIFICATION_INTERVAL_SECS",
                DEFAULT_VERIFICATION_INTERVAL_SECS,
            ),
            stats_interval: env_secs("STATS_INTERVAL_SECS", DEFAULT_STATS_INTERVAL_SECS),
            cleanup_interval: env_secs("CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS),
            stuck_live_hours: env::var("STUCK_LIVE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(funbet_core::config::DEFAULT_STUCK_LIVE_HOURS),
            stats_staleness_hours: env::var("STATS_STALENESS_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(funbet_core::config::DEFAULT_STATS_STALENESS_HOURS),
        }
    }
}
