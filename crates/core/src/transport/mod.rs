//! UDP/TCP transport: address resolution, a non-blocking socket pair keyed
//! by the same remote address, and the background I/O thread that drains
//! them into the main tick thread's inbound queue (`SPEC_FULL.md` §5).

pub mod io_thread;
pub mod resolve;
pub mod socket;

pub use io_thread::{spawn_io_thread, InboundFrame, IoHandle, OutboundFrame};
pub use resolve::ResolveCache;
pub use socket::{PollEvent, Transport};

use std::time::Duration;

/// Reliable-channel keep-alive interval. A missed reply for
/// `KEEPALIVE_MISSED_LIMIT * KEEPALIVE_INTERVAL` triggers a reconnect.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);
pub const KEEPALIVE_MISSED_LIMIT: u32 = 3;
/// Handshake / TCP connect timeout (`SPEC_FULL.md` §5).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to resolve address: {0}")]
    ResolveFailed(String),
    #[error("failed to connect: {0}")]
    ConnectFailed(String),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("socket error: {0}")]
    SocketError(String),
    #[error("operation timed out")]
    Timeout,
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            TransportError::Timeout
        } else {
            TransportError::SocketError(e.to_string())
        }
    }
}
