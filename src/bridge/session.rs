//! Bridge session orchestration and the bidirectional relay
//!
//! One session owns one client WebSocket and one upstream TCP connection.
//! Establishment runs before the upgrade completes: resolve the upstream,
//! build the PROXY line, dial, write the preamble. The relay then runs two
//! independent workers, one per direction, until either reports a failure;
//! the first failure wins and tears the whole session down.

use crate::bridge::preamble::{LineEnding, build_proxy_line};
use crate::bridge::resolver::ClientEndpoint;
use crate::bridge::upstream::{Upstream, send_preamble};
use crate::config::Config;
use crate::error::{Direction, Error, Result};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Shared bridge state: the upstream target and the relay settings.
///
/// Sessions themselves are independent and self-contained; the bridge only
/// carries configuration and a session counter for log correlation.
pub struct Bridge {
    upstream: Upstream,
    upstream_port: String,
    buffer_size: usize,
    line_ending: LineEnding,
    session_counter: AtomicU64,
}

impl Bridge {
    /// Create a bridge from the resolved configuration
    pub fn new(config: &Config) -> Self {
        Self {
            upstream: Upstream::new(&config.upstream_host, &config.upstream_port),
            upstream_port: config.upstream_port.clone(),
            buffer_size: config.buffer_size,
            line_ending: config.line_ending,
            session_counter: AtomicU64::new(0),
        }
    }

    /// Relay buffer size, shared with the WebSocket upgrade negotiation
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Allocate the next session id for log correlation
    pub fn next_session_id(&self) -> u64 {
        self.session_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Establish the upstream leg for a session: resolve the target, build
    /// the PROXY line, dial, and write the preamble as the first bytes.
    ///
    /// Any failure here aborts the session before a relay worker exists and
    /// before the client's upgrade completes.
    pub async fn establish(&self, client: &ClientEndpoint) -> Result<TcpStream> {
        let addr = self.upstream.resolve().await?;
        let line = build_proxy_line(client, addr.ip(), &self.upstream_port, self.line_ending)?;

        let mut stream = self.upstream.connect(addr).await?;
        send_preamble(&mut stream, &line).await?;

        Ok(stream)
    }

    /// Run the two relay workers until either direction fails, then tear
    /// both down and report the first failure.
    pub async fn relay(&self, socket: WebSocket, upstream: TcpStream) -> Result<()> {
        let (ws_writer, ws_reader) = socket.split();
        let (tcp_reader, tcp_writer) = upstream.into_split();

        // Bounded failure channel sized so neither worker blocks on report
        // delivery.
        let (errc, mut failures) = mpsc::channel::<Error>(2);

        let client_to_upstream = tokio::spawn(pump_client_to_upstream(
            ws_reader,
            tcp_writer,
            errc.clone(),
        ));
        let upstream_to_client = tokio::spawn(pump_upstream_to_client(
            tcp_reader,
            ws_writer,
            errc,
            self.buffer_size,
        ));

        // First failure wins. Aborting both workers drops their connection
        // halves, which closes both endpoints and unblocks the other side.
        let cause = failures.recv().await;
        client_to_upstream.abort();
        upstream_to_client.abort();

        match cause {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Client->upstream worker: each WebSocket message's payload is written
/// verbatim to the upstream connection. FIFO within this direction.
async fn pump_client_to_upstream(
    mut ws_reader: SplitStream<WebSocket>,
    mut tcp_writer: OwnedWriteHalf,
    errc: mpsc::Sender<Error>,
) {
    let cause = loop {
        match ws_reader.next().await {
            Some(Ok(Message::Binary(data))) => {
                trace!(bytes = data.len(), "Relaying client message to upstream");
                if let Err(e) = tcp_writer.write_all(&data).await {
                    break Error::relay(
                        Direction::ClientToUpstream,
                        format!("TCP write error: {}", e),
                    );
                }
            }
            Some(Ok(Message::Text(text))) => {
                trace!(bytes = text.len(), "Relaying client text to upstream");
                if let Err(e) = tcp_writer.write_all(text.as_bytes()).await {
                    break Error::relay(
                        Direction::ClientToUpstream,
                        format!("TCP write error: {}", e),
                    );
                }
            }
            // Ping/Pong are handled by the WebSocket layer and not relayed.
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => {
                break Error::relay(Direction::ClientToUpstream, "client closed connection");
            }
            Some(Err(e)) => {
                break Error::relay(
                    Direction::ClientToUpstream,
                    format!("WebSocket read error: {}", e),
                );
            }
        }
    };

    let _ = errc.send(cause).await;
}

/// Upstream->client worker: each chunk read from the upstream is forwarded
/// as one binary WebSocket message, exactly the bytes read. FIFO within
/// this direction.
async fn pump_upstream_to_client(
    mut tcp_reader: OwnedReadHalf,
    mut ws_writer: SplitSink<WebSocket, Message>,
    errc: mpsc::Sender<Error>,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    let cause = loop {
        match tcp_reader.read(&mut buf).await {
            Ok(0) => {
                break Error::relay(Direction::UpstreamToClient, "upstream closed connection");
            }
            Ok(n) => {
                trace!(bytes = n, "Relaying upstream chunk to client");
                if let Err(e) = ws_writer.send(Message::Binary(buf[..n].to_vec())).await {
                    break Error::relay(
                        Direction::UpstreamToClient,
                        format!("WebSocket send error: {}", e),
                    );
                }
            }
            Err(e) => {
                break Error::relay(
                    Direction::UpstreamToClient,
                    format!("TCP read error: {}", e),
                );
            }
        }
    };

    debug!("Upstream relay worker exiting");
    let _ = errc.send(cause).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tokio::net::TcpListener;

    fn test_config(upstream_port: &str) -> Config {
        let cli = crate::cli::Cli::parse_from([
            "wsbridge",
            "--upstream",
            "127.0.0.1",
            "--upstream-port",
            upstream_port,
        ]);
        Config::from_cli(&cli).unwrap()
    }

    #[test]
    fn test_session_ids_are_sequential() {
        let bridge = Bridge::new(&test_config("7778"));
        assert_eq!(bridge.next_session_id(), 0);
        assert_eq!(bridge.next_session_id(), 1);
        assert_eq!(bridge.next_session_id(), 2);
    }

    #[tokio::test]
    async fn test_establish_writes_preamble_first() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let accept = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 128];
            let n = tokio::io::AsyncReadExt::read(&mut stream, &mut buf)
                .await
                .unwrap();
            buf.truncate(n);
            buf
        });

        let bridge = Bridge::new(&test_config(&port.to_string()));
        let client = ClientEndpoint::new("203.0.113.5".parse().unwrap(), 54321);
        let _stream = bridge.establish(&client).await.unwrap();

        let received = accept.await.unwrap();
        let expected = format!("PROXY TCP4 203.0.113.5 127.0.0.1 54321 {}\n", port);
        assert_eq!(received, expected.into_bytes());
    }

    #[tokio::test]
    async fn test_establish_refused_upstream_fails_before_relay() {
        // Grab a free port, then close the listener so the dial is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let bridge = Bridge::new(&test_config(&port.to_string()));
        let client = ClientEndpoint::new("203.0.113.5".parse().unwrap(), 54321);

        let result = bridge.establish(&client).await;
        assert!(matches!(result, Err(Error::UpstreamConnect(_))));
    }
}
