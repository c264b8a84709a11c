//! Connection-bridging core
//!
//! Components for bridging one WebSocket client to the TCP upstream:
//! - `resolver`: client address resolution (transport peer vs. forwarding headers)
//! - `preamble`: PROXY protocol v1 line construction
//! - `upstream`: upstream resolution, dialing, and preamble write
//! - `session`: per-connection orchestration and the two relay workers

mod preamble;
mod resolver;
mod session;
mod upstream;

pub use preamble::{LineEnding, build_proxy_line};
pub use resolver::{ClientEndpoint, FORWARDED_IP_HEADER, FORWARDED_PORT_HEADER, resolve_client};
pub use session::Bridge;
pub use upstream::{Upstream, send_preamble};
