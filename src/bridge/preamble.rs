//! PROXY protocol v1 preamble construction
//!
//! Builds the single text line sent to the upstream before any payload:
//!
//! ```text
//! PROXY TCP4 203.0.113.5 127.0.0.1 54321 7778\n
//! ```
//!
//! The address family tag follows the client IP: anything with a 4-byte
//! representation (plain IPv4 or an IPv4-mapped IPv6 address) is TCP4,
//! everything else is TCP6.

use crate::bridge::resolver::ClientEndpoint;
use crate::error::{Error, Result};
use std::net::IpAddr;

/// PROXY line terminator mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Terminate with a single line feed
    #[default]
    Lf,
    /// Terminate with carriage return + line feed
    Crlf,
}

impl LineEnding {
    fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Build the PROXY protocol v1 line for a session.
///
/// `dest_ip` is the resolved upstream address the bridge dials; the PROXY
/// protocol calls it the destination address. `upstream_port` is echoed
/// verbatim from configuration.
pub fn build_proxy_line(
    client: &ClientEndpoint,
    dest_ip: IpAddr,
    upstream_port: &str,
    ending: LineEnding,
) -> Result<String> {
    if client.ip.is_unspecified() || dest_ip.is_unspecified() {
        return Err(Error::PreambleBuild(
            "Client and destination addresses must be specified".to_string(),
        ));
    }

    // Reduce an IPv4-mapped client address to its 4-byte form so the tag
    // and the textual address agree.
    let client_ip = match client.ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => client.ip,
        },
        ip => ip,
    };

    let tag = match client_ip {
        IpAddr::V4(_) => "PROXY TCP4",
        IpAddr::V6(_) => "PROXY TCP6",
    };

    Ok(format!(
        "{} {} {} {} {}{}",
        tag,
        client_ip,
        dest_ip,
        client.port,
        upstream_port,
        ending.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(ip: &str, port: u16) -> ClientEndpoint {
        ClientEndpoint::new(ip.parse().unwrap(), port)
    }

    #[test]
    fn test_ipv4_client_uses_tcp4_tag() {
        let line = build_proxy_line(
            &client("203.0.113.5", 54321),
            "127.0.0.1".parse().unwrap(),
            "7778",
            LineEnding::Lf,
        )
        .unwrap();
        assert_eq!(line, "PROXY TCP4 203.0.113.5 127.0.0.1 54321 7778\n");
    }

    #[test]
    fn test_ipv6_client_uses_tcp6_tag() {
        let line = build_proxy_line(
            &client("2001:db8::1", 443),
            "2001:db8::ff".parse().unwrap(),
            "7778",
            LineEnding::Lf,
        )
        .unwrap();
        assert_eq!(line, "PROXY TCP6 2001:db8::1 2001:db8::ff 443 7778\n");
    }

    #[test]
    fn test_ipv4_mapped_client_reduces_to_tcp4() {
        let line = build_proxy_line(
            &client("::ffff:203.0.113.5", 54321),
            "127.0.0.1".parse().unwrap(),
            "7778",
            LineEnding::Lf,
        )
        .unwrap();
        assert_eq!(line, "PROXY TCP4 203.0.113.5 127.0.0.1 54321 7778\n");
    }

    #[test]
    fn test_crlf_terminator() {
        let line = build_proxy_line(
            &client("203.0.113.5", 54321),
            "127.0.0.1".parse().unwrap(),
            "7778",
            LineEnding::Crlf,
        )
        .unwrap();
        assert!(line.ends_with("\r\n"));
    }

    #[test]
    fn test_line_has_six_tokens() {
        let line = build_proxy_line(
            &client("203.0.113.5", 54321),
            "192.0.2.1".parse().unwrap(),
            "7778",
            LineEnding::Lf,
        )
        .unwrap();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(
            tokens,
            vec!["PROXY", "TCP4", "203.0.113.5", "192.0.2.1", "54321", "7778"]
        );
    }

    #[test]
    fn test_unspecified_address_rejected() {
        let result = build_proxy_line(
            &client("0.0.0.0", 54321),
            "127.0.0.1".parse().unwrap(),
            "7778",
            LineEnding::Lf,
        );
        assert!(matches!(result, Err(Error::PreambleBuild(_))));

        let result = build_proxy_line(
            &client("203.0.113.5", 54321),
            "::".parse().unwrap(),
            "7778",
            LineEnding::Lf,
        );
        assert!(matches!(result, Err(Error::PreambleBuild(_))));
    }
}
