//! Command line interface for wsbridge
//!
//! Every data flag has an environment-variable fallback so the bridge can
//! be configured either way (flags win over environment).

use clap::Parser;

/// WebSocket to TCP bridge with PROXY protocol v1 support
#[derive(Parser, Debug, Clone)]
#[command(name = "wsbridge", version, about)]
pub struct Cli {
    /// Upstream server address (hostname or IP literal)
    #[arg(short, long, env = "WSBRIDGE_UPSTREAM", default_value = "localhost")]
    pub upstream: String,

    /// Upstream server port
    #[arg(long, env = "WSBRIDGE_UPSTREAM_PORT", default_value = "7778")]
    pub upstream_port: String,

    /// Address to listen on for WebSocket connections
    #[arg(
        short,
        long,
        env = "WSBRIDGE_LISTEN_ADDRESS",
        default_value = "127.0.0.1:7654"
    )]
    pub listen_address: String,

    /// Relay buffer size in bytes
    ///
    /// Bounds the largest single chunk relayed from the upstream to the
    /// client and sizes the WebSocket write buffer.
    #[arg(short, long, env = "WSBRIDGE_BUFFER_SIZE", default_value_t = 4096)]
    pub buffer_size: usize,

    /// Terminate the PROXY line with CR-LF instead of a bare LF
    #[arg(long, env = "WSBRIDGE_CRLF")]
    pub crlf: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
