//! Server configuration.
//!
//! Runtime settings come from the environment (a `.env` file is loaded
//! first by the binary). Simulation tuning lives in
//! [`starfall_core::game_loop::GameConfig`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Capacity of the channel carrying client input to the world task.
pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
/// Outbound messages buffered per client before new ones are dropped.
pub const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Maximum logged-in players.
    pub max_players: usize,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// RON data tables. Built-in tables when unset.
    pub data_path: Option<PathBuf>,
    /// Simulation seed. Drawn from entropy when unset.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_players: 64,
            tick_rate: 30,
            data_path: None,
            seed: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value, "Ignoring unparseable setting");
            None
        }
    }
}

impl ServerConfig {
    /// Read `STARFALL_*` variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("STARFALL_PORT").unwrap_or(defaults.port),
            max_players: parsed("STARFALL_MAX_PLAYERS").unwrap_or(defaults.max_players),
            tick_rate: parsed("STARFALL_TICK_RATE").unwrap_or(defaults.tick_rate),
            data_path: env::var_os("STARFALL_DATA").map(PathBuf::from),
            seed: parsed("STARFALL_SEED"),
        }
    }

    /// Time between ticks. A zero tick rate is treated as one per second.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}
