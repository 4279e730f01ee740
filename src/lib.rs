//! Godot MCP bridge - exposes the Godot editor and a running game instance
//! as MCP tools over a newline-framed JSON/TCP bridging protocol.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod endpoint;
pub mod logging;
pub mod mcp_protocol;
pub mod server;
pub mod tools;
pub mod transport;

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
