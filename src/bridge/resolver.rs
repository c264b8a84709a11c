//! Client address resolution
//!
//! Determines the client's logical IP and port, either from the transport
//! peer address or from forwarding headers supplied by a trusted reverse
//! proxy in front of the bridge. Deciding whether the immediate peer is a
//! trusted proxy is the deployment's responsibility, not ours.

use crate::error::{Error, Result};
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Header carrying the forwarded client IP
pub const FORWARDED_IP_HEADER: &str = "x-forwarded-for";

/// Header carrying the forwarded client port
pub const FORWARDED_PORT_HEADER: &str = "x-forwarded-port";

/// The client's resolved logical endpoint, fixed for the session lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientEndpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl ClientEndpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

/// Resolve the client endpoint from the transport peer address and the
/// upgrade request headers.
///
/// A forwarded IP header fully replaces the transport IP; a forwarded port
/// header (only consulted alongside the IP header) fully replaces the
/// transport port. The two overrides are independent: an IP override with
/// no port header keeps the transport port.
pub fn resolve_client(peer: SocketAddr, headers: &HeaderMap) -> Result<ClientEndpoint> {
    let mut ip = peer.ip();
    let mut port = peer.port();

    if let Some(forwarded_ip) = headers.get(FORWARDED_IP_HEADER) {
        let value = forwarded_ip.to_str().map_err(|_| {
            Error::AddressResolution(format!(
                "{} header is not valid ASCII",
                FORWARDED_IP_HEADER
            ))
        })?;

        ip = value.trim().parse().map_err(|_| {
            Error::AddressResolution(format!(
                "{} header is not an IP literal: {}",
                FORWARDED_IP_HEADER, value
            ))
        })?;

        if let Some(forwarded_port) = headers.get(FORWARDED_PORT_HEADER) {
            let value = forwarded_port.to_str().map_err(|_| {
                Error::AddressResolution(format!(
                    "{} header is not valid ASCII",
                    FORWARDED_PORT_HEADER
                ))
            })?;

            port = value.trim().parse().map_err(|_| {
                Error::AddressResolution(format!(
                    "Invalid {} value: {}",
                    FORWARDED_PORT_HEADER, value
                ))
            })?;
        }
    }

    Ok(ClientEndpoint::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.10:50000".parse().unwrap()
    }

    #[test]
    fn test_no_headers_uses_peer_verbatim() {
        let endpoint = resolve_client(peer(), &HeaderMap::new()).unwrap();
        assert_eq!(endpoint.ip, "192.0.2.10".parse::<IpAddr>().unwrap());
        assert_eq!(endpoint.port, 50000);
    }

    #[test]
    fn test_forwarded_ip_keeps_transport_port() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_IP_HEADER, HeaderValue::from_static("203.0.113.5"));

        let endpoint = resolve_client(peer(), &headers).unwrap();
        assert_eq!(endpoint.ip, "203.0.113.5".parse::<IpAddr>().unwrap());
        assert_eq!(endpoint.port, 50000);
    }

    #[test]
    fn test_forwarded_ip_and_port_override_both() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_IP_HEADER, HeaderValue::from_static("2001:db8::1"));
        headers.insert(FORWARDED_PORT_HEADER, HeaderValue::from_static("54321"));

        let endpoint = resolve_client(peer(), &headers).unwrap();
        assert_eq!(endpoint.ip, "2001:db8::1".parse::<IpAddr>().unwrap());
        assert_eq!(endpoint.port, 54321);
    }

    #[test]
    fn test_forwarded_port_alone_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_PORT_HEADER, HeaderValue::from_static("54321"));

        let endpoint = resolve_client(peer(), &headers).unwrap();
        assert_eq!(endpoint.port, 50000);
    }

    #[test]
    fn test_invalid_forwarded_ip_fails() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_IP_HEADER, HeaderValue::from_static("not-an-ip"));

        let result = resolve_client(peer(), &headers);
        assert!(matches!(result, Err(Error::AddressResolution(_))));
    }

    #[test]
    fn test_invalid_forwarded_port_fails() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_IP_HEADER, HeaderValue::from_static("203.0.113.5"));
        headers.insert(FORWARDED_PORT_HEADER, HeaderValue::from_static("54o21"));

        let result = resolve_client(peer(), &headers);
        assert!(matches!(result, Err(Error::AddressResolution(_))));
    }

    #[test]
    fn test_ipv6_peer_passthrough() {
        let peer: SocketAddr = "[2001:db8::2]:443".parse().unwrap();
        let endpoint = resolve_client(peer, &HeaderMap::new()).unwrap();
        assert_eq!(endpoint.ip, "2001:db8::2".parse::<IpAddr>().unwrap());
        assert_eq!(endpoint.port, 443);
    }
}
