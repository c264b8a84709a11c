//! Runtime configuration for wsbridge
//!
//! The configuration is resolved once at process start from CLI flags and
//! environment variables, then passed by reference into the server and each
//! session's components. There is no mutable global state.

use crate::bridge::LineEnding;
use crate::cli::Cli;
use crate::error::{Error, Result};

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream server address (hostname or IP literal)
    pub upstream_host: String,
    /// Upstream server port, kept textual so it can be resolved together
    /// with the host and echoed verbatim into the PROXY line
    pub upstream_port: String,
    /// Address the WebSocket listener binds to
    pub listen_address: String,
    /// Relay buffer size in bytes
    pub buffer_size: usize,
    /// PROXY line terminator mode
    pub line_ending: LineEnding,
}

impl Config {
    /// Build and validate a configuration from parsed CLI arguments
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.upstream.trim().is_empty() {
            return Err(Error::Config(
                "Upstream server address must be specified".to_string(),
            ));
        }

        match cli.upstream_port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(Error::Config(format!(
                    "Invalid upstream port: {}",
                    cli.upstream_port
                )));
            }
            Ok(_) => {}
        }

        if cli.buffer_size == 0 {
            return Err(Error::Config(
                "Buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            upstream_host: cli.upstream.clone(),
            upstream_port: cli.upstream_port.clone(),
            listen_address: cli.listen_address.clone(),
            buffer_size: cli.buffer_size,
            line_ending: if cli.crlf {
                LineEnding::Crlf
            } else {
                LineEnding::Lf
            },
        })
    }
}
