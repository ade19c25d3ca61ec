//! Server settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DarkhouseError;

/// Environment variable holding the listen address.
pub const ENV_ADDR: &str = "DARKHOUSE_ADDR";
/// Environment variable holding the game-loop tick rate in Hz.
pub const ENV_TICK_RATE: &str = "DARKHOUSE_TICK_RATE";

/// Everything the server needs to know before it binds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Game-loop ticks per second. 0 disables the game loop clock.
    pub tick_rate_hz: u32,
    /// Largest step handed to the movement integrator in one tick.
    pub max_dt: Duration,
    /// How often empty rooms are dropped. `None` keeps them forever.
    pub prune_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_rate_hz: 30,
            max_dt: Duration::from_millis(250),
            prune_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by [`ENV_ADDR`] and [`ENV_TICK_RATE`].
    pub fn from_env() -> Result<Self, DarkhouseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DarkhouseError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_ADDR) {
            config.bind_addr = addr;
        }
        if let Some(rate) = lookup(ENV_TICK_RATE) {
            config.tick_rate_hz = rate.trim().parse().map_err(|_| {
                DarkhouseError::Config(format!("{ENV_TICK_RATE} must be a whole number, got {rate:?}"))
            })?;
        }

        Ok(config)
    }
}
