//! Endpoint routing for the two Godot command listeners.
//!
//! Two fixed endpoints exist for the lifetime of the process: the editor
//! plugin (TCP 9500) and the running game autoload (TCP 9501). The game port
//! may be overridden by the config file; the editor port is fixed.

use std::time::Duration;

use crate::config::Config;

/// TCP port of the editor plugin listener.
pub const EDITOR_PORT: u16 = 9500;
/// Default TCP port of the running game listener.
pub const GAME_PORT: u16 = 9501;

/// Default per-call timeout for ordinary commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Screenshot capture and PNG encoding on the Godot side is slower than
/// tree/property queries, so that one command gets a longer deadline.
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Logical target of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The Godot editor plugin.
    Editor,
    /// The running game instance.
    Game,
}

/// A resolved remote listener: port, default deadline, and the display name
/// used in connection-failure messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub port: u16,
    pub default_timeout: Duration,
    pub name: &'static str,
}

impl Target {
    /// Resolve this target against the loaded config. Pure lookup; no
    /// endpoint is ever created or destroyed at runtime beyond these two.
    pub fn endpoint(self, config: &Config) -> Endpoint {
        match self {
            Target::Editor => Endpoint {
                port: EDITOR_PORT,
                default_timeout: DEFAULT_TIMEOUT,
                name: "editor",
            },
            Target::Game => Endpoint {
                port: config.game_port,
                default_timeout: DEFAULT_TIMEOUT,
                name: "game",
            },
        }
    }
}
