//! HTTP listener and WebSocket upgrade handling
//!
//! The server accepts WebSocket upgrades on any path and hands each
//! accepted client to the bridge. The upstream leg is established before
//! the upgrade completes, so pre-session failures surface to the client as
//! a plain HTTP error response instead of an upgrade followed by an
//! immediate close.

use crate::bridge::{Bridge, resolve_client};
use crate::error::{Error, Result};
use axum::Router;
use axum::extract::ws::WebSocket;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// WebSocket server that feeds accepted clients into the bridge
pub struct Server {
    /// Address to listen on
    listen_address: String,
    /// The listener (created on bind)
    listener: Option<TcpListener>,
}

impl Server {
    /// Create a new server that will listen on the specified address
    pub fn new(listen_address: impl Into<String>) -> Self {
        Self {
            listen_address: listen_address.into(),
            listener: None,
        }
    }

    /// Bind the listener
    pub async fn bind(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.listen_address).await.map_err(|e| {
            Error::Socket(format!(
                "Failed to bind to {}: {}",
                self.listen_address, e
            ))
        })?;

        info!(address = %self.listen_address, "Server listening");
        self.listener = Some(listener);
        Ok(())
    }

    /// Get the bound local address
    ///
    /// Useful when listening on port 0 (tests).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| Error::Socket("Server is not bound".to_string()))?;
        listener
            .local_addr()
            .map_err(|e| Error::Socket(format!("Failed to get local address: {}", e)))
    }

    /// Serve WebSocket upgrades until the shutdown signal flips to true
    pub async fn run(self, bridge: Arc<Bridge>, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| Error::Socket("Server is not bound".to_string()))?;

        // Path-agnostic: every path accepts an upgrade, routing is left to
        // whatever sits in front of the bridge.
        let app = Router::new().fallback(ws_handler).with_state(bridge);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
            info!("Received shutdown signal, stopping server");
        })
        .await
        .map_err(|e| Error::Socket(format!("Server error: {}", e)))
    }
}

/// Handle one upgrade request: resolve the client address, establish the
/// upstream leg, then complete the upgrade into the relay.
async fn ws_handler(
    State(bridge): State<Arc<Bridge>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let session = bridge.next_session_id();
    debug!(session, client = %peer, "WebSocket connection request");

    let client = match resolve_client(peer, &headers) {
        Ok(client) => client,
        Err(e) => {
            warn!(session, client = %peer, error = %e, "Failed to resolve client address");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let upstream = match bridge.establish(&client).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(session, client = %peer, error = %e, "Failed to establish upstream leg");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    info!(
        session,
        client_ip = %client.ip,
        client_port = client.port,
        "Session established"
    );

    ws.write_buffer_size(bridge.buffer_size())
        .on_upgrade(move |socket| handle_session(bridge, session, socket, upstream))
}

async fn handle_session(bridge: Arc<Bridge>, session: u64, socket: WebSocket, upstream: TcpStream) {
    // Relay termination is the normal end of a session; the cause is only
    // interesting for debugging.
    match bridge.relay(socket, upstream).await {
        Ok(()) => debug!(session, "Session ended"),
        Err(e) => debug!(session, cause = %e, "Session ended"),
    }
}
