//! Upstream TCP connection handling
//!
//! Resolves and dials the configured upstream endpoint, then writes the
//! PROXY preamble as the first bytes on the fresh connection. There is no
//! retry and no connect timeout beyond the platform default.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tracing::{debug, trace};

/// The configured upstream target, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct Upstream {
    host: String,
    port: String,
}

impl Upstream {
    /// Create a new upstream target
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// Get the target in host:port form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the target to a concrete socket address.
    ///
    /// Resolution runs once per session so DNS changes apply to new
    /// sessions without a restart. The first resolved address wins.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let address = self.address();

        let mut addrs = lookup_host(&address).await.map_err(|e| {
            Error::UpstreamResolution(format!("Failed to resolve {}: {}", address, e))
        })?;

        let addr = addrs.next().ok_or_else(|| {
            Error::UpstreamResolution(format!("No addresses found for {}", address))
        })?;

        trace!(target = %address, resolved = %addr, "Resolved upstream address");
        Ok(addr)
    }

    /// Open a single TCP connection to the resolved address
    pub async fn connect(&self, addr: SocketAddr) -> Result<TcpStream> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            Error::UpstreamConnect(format!("Failed to connect to upstream {}: {}", addr, e))
        })?;

        debug!(upstream = %addr, "Connected to upstream");
        Ok(stream)
    }
}

/// Write the PROXY preamble as the first bytes on a fresh upstream
/// connection, before any relay worker starts.
pub async fn send_preamble(stream: &mut TcpStream, line: &str) -> Result<()> {
    stream.write_all(line.as_bytes()).await.map_err(|e| {
        Error::PreambleWrite(format!("Failed to send PROXY line to upstream: {}", e))
    })?;
    stream
        .flush()
        .await
        .map_err(|e| Error::PreambleWrite(format!("Failed to flush PROXY line: {}", e)))?;

    trace!(line = line.trim_end(), "Sent PROXY preamble");
    Ok(())
}
