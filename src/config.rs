//! Port override configuration.
//!
//! The running game can be launched with a randomized command port, recorded
//! in `mcp_ports.json` next to the project. A missing file means defaults; a
//! malformed one logs a warning and falls back to defaults rather than
//! refusing to start.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::endpoint::GAME_PORT;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "mcp_ports.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Port of the running game listener. The editor port is not overridable.
    #[serde(default = "default_game_port")]
    pub game_port: u16,
}

fn default_game_port() -> u16 {
    GAME_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_port: GAME_PORT,
        }
    }
}

impl Config {
    /// Load port overrides, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Config {
        if !path.exists() {
            info!(path = %path.display(), "Port config not found, using defaults");
            return Config::default();
        }

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read port config, using defaults");
                return Config::default();
            }
        };

        match serde_json::from_str::<Config>(&raw) {
            Ok(config) => {
                info!(path = %path.display(), game_port = config.game_port, "Loaded port config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse port config, using defaults");
                Config::default()
            }
        }
    }
}
