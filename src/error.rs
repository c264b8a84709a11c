//! Error types for wsbridge

use std::fmt;
use thiserror::Error;

/// Which relay direction a mid-session failure occurred on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToUpstream => write!(f, "client->upstream"),
            Direction::UpstreamToClient => write!(f, "upstream->client"),
        }
    }
}

/// Main error type for wsbridge
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address resolution error: {0}")]
    AddressResolution(String),

    #[error("Preamble build error: {0}")]
    PreambleBuild(String),

    #[error("Upstream resolution error: {0}")]
    UpstreamResolution(String),

    #[error("Upstream connect error: {0}")]
    UpstreamConnect(String),

    #[error("Preamble write error: {0}")]
    PreambleWrite(String),

    #[error("Relay error ({direction}): {reason}")]
    Relay { direction: Direction, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Socket error: {0}")]
    Socket(String),
}

impl Error {
    /// Build a relay error for the given direction
    pub fn relay(direction: Direction, reason: impl Into<String>) -> Self {
        Error::Relay {
            direction,
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::ClientToUpstream.to_string(), "client->upstream");
        assert_eq!(Direction::UpstreamToClient.to_string(), "upstream->client");
    }

    #[test]
    fn test_relay_error_message() {
        let err = Error::relay(Direction::UpstreamToClient, "connection reset");
        assert_eq!(
            err.to_string(),
            "Relay error (upstream->client): connection reset"
        );
    }
}
