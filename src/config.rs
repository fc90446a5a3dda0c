use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::TimeControl;

/// Relay server settings, from flags or `CHESS_SESSION_*` environment variables
#[derive(Parser, Debug, Clone)]
#[command(name = "chess_session", about = "Two-player chess sessions over WebSocket")]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "CHESS_SESSION_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "CHESS_SESSION_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding index.html and client assets
    #[arg(long, env = "CHESS_SESSION_STATIC_DIR", default_value = "./static")]
    pub static_dir: PathBuf,

    /// Base time for games created without an explicit time control
    #[arg(long, env = "CHESS_SESSION_BASE_MINUTES", default_value_t = 5)]
    pub base_minutes: u32,

    #[arg(long, env = "CHESS_SESSION_INCREMENT_SECONDS", default_value_t = 3)]
    pub increment_seconds: u32,

    /// How often each connection checks its game for a flagged clock
    #[arg(long, env = "CHESS_SESSION_CLOCK_CHECK_MS", default_value_t = 250)]
    pub clock_check_interval_ms: u64,
}

impl Config {
    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    pub fn default_time_control(&self) -> TimeControl {
        TimeControl::new(self.base_minutes, self.increment_seconds)
    }

    pub fn clock_check_interval(&self) -> Duration {
        Duration::from_millis(self.clock_check_interval_ms.max(10))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("./static"),
            base_minutes: 5,
            increment_seconds: 3,
            clock_check_interval_ms: 250,
        }
    }
}
