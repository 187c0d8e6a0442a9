//! Runtime settings.
//!
//! Layered configuration: optional `config/default.toml` file, overridden
//! by `CHEMPAY_`-prefixed environment variables (`CHEMPAY_BIND_ADDR`,
//! `CHEMPAY_POLL_INTERVAL_SECS`, ...). `.env` files are loaded by the
//! binary before this runs.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Cadence of instant-payment status polls, in seconds.
    pub poll_interval_secs: u64,
    /// Countdown granularity, in seconds.
    pub countdown_tick_secs: u64,
    /// Root directory for stored transfer receipts.
    pub receipt_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            poll_interval_secs: 3,
            countdown_tick_secs: 1,
            receipt_dir: "uploads/receipts".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("CHEMPAY"))
            .build()?
            .try_deserialize()
    }

    pub fn poller_config(&self) -> crate::sessions::PollerConfig {
        crate::sessions::PollerConfig {
            poll_interval: std::time::Duration::from_secs(self.poll_interval_secs.max(1)),
            countdown_tick: std::time::Duration::from_secs(self.countdown_tick_secs.max(1)),
        }
    }
}
