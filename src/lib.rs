//! wsbridge - WebSocket to TCP bridge with PROXY protocol v1 support
//!
//! This library bridges WebSocket clients to a plain TCP upstream service,
//! relaying bytes transparently in both directions. The upstream is told the
//! originating client's real address via a PROXY protocol v1 preamble line,
//! so IP-based policy (bans, geolocation, logging) keeps working behind the
//! bridge.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod server;

pub use error::{Direction, Error, Result};

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const NAME: &str = env!("CARGO_PKG_NAME");
