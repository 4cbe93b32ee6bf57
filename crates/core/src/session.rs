//! Connection lifecycle state machine (`SPEC_FULL.md` §4.3):
//! `Disconnected -> Resolving -> TcpConnecting -> Handshaking ->
//! Authenticating -> Established -> (Reconnecting)`.

use std::time::{Duration, Instant};

use crate::crypto::{KeyBox, SymmetricBox};
use crate::transport::{IoHandle, KEEPALIVE_INTERVAL, KEEPALIVE_MISSED_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Resolving,
    TcpConnecting,
    Handshaking,
    Authenticating,
    Established,
    Reconnecting,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("address resolution failed: {0}")]
    ResolveFailed(String),
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("protocol mismatch with server")]
    ProtocolMismatch,
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("banned: {0}")]
    Banned(String),
    #[error("muted: {0}")]
    Muted(String),
    #[error("server requires secure mode but no fresh central-server token is available")]
    SecureModeUnsupported,
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),
    #[error(transparent)]
    Frame(#[from] crate::codec::FrameError),
}

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Tracks reconnect backoff: exponential with full jitter, capped at 30s
/// (`SPEC_FULL.md` §5).
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    attempt: u32,
    next_at: Instant,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self {
            attempt: 0,
            next_at: Instant::now(),
        }
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        now >= self.next_at
    }

    /// Call after a failed reconnect attempt: doubles the window and
    /// re-samples a full-jitter delay within it.
    pub fn record_failure(&mut self, now: Instant, jitter: f32) {
        self.attempt += 1;
        let window = (BASE_BACKOFF * 2u32.saturating_pow(self.attempt.min(8))).min(MAX_BACKOFF);
        let delay = window.mul_f32(jitter.clamp(0.0, 1.0));
        self.next_at = now + delay;
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.next_at = Instant::now();
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep-alive tracking for the reliable channel: a ping every
/// `KEEPALIVE_INTERVAL`, a missed reply for `KEEPALIVE_MISSED_LIMIT`
/// intervals triggers a reconnect.
pub struct KeepAlive {
    last_ping_sent: Instant,
    last_pong_received: Instant,
}

impl KeepAlive {
    pub fn new(now: Instant) -> Self {
        Self {
            last_ping_sent: now,
            last_pong_received: now,
        }
    }

    pub fn should_send_ping(&self, now: Instant) -> bool {
        now.duration_since(self.last_ping_sent) >= KEEPALIVE_INTERVAL
    }

    pub fn record_ping_sent(&mut self, now: Instant) {
        self.last_ping_sent = now;
    }

    pub fn record_pong(&mut self, now: Instant) {
        self.last_pong_received = now;
    }

    pub fn is_dead(&self, now: Instant) -> bool {
        now.duration_since(self.last_pong_received) >= KEEPALIVE_INTERVAL * KEEPALIVE_MISSED_LIMIT
    }
}

/// Crypto material established during the `Handshaking` step.
pub struct SessionCrypto {
    pub keybox: KeyBox,
    pub shared: Option<SymmetricBox>,
}

impl SessionCrypto {
    pub fn new() -> Self {
        Self {
            keybox: KeyBox::generate(),
            shared: None,
        }
    }
}

impl Default for SessionCrypto {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the connection lifecycle. Holds the transport I/O handle once
/// connected; owns no GameSurface reference (the surface is consumed via
/// the `Core`, not the `Session`).
pub struct Session {
    state: SessionState,
    pub crypto: SessionCrypto,
    pub io: Option<IoHandle>,
    pub account_id: Option<i32>,
    pub server_tps: u32,
    keep_alive: Option<KeepAlive>,
    backoff: ReconnectBackoff,
    handshake_started_at: Option<Instant>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            crypto: SessionCrypto::new(),
            io: None,
            account_id: None,
            server_tps: 30,
            keep_alive: None,
            backoff: ReconnectBackoff::new(),
            handshake_started_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }

    pub fn backoff(&self) -> &ReconnectBackoff {
        &self.backoff
    }

    /// `Disconnected -> Resolving`. The caller performs the actual
    /// resolve/connect (it owns the socket-creating side effects); this
    /// just records the intended transition.
    pub fn begin_connect(&mut self) {
        self.state = SessionState::Resolving;
        self.handshake_started_at = Some(Instant::now());
    }

    pub fn enter_tcp_connecting(&mut self) {
        self.state = SessionState::TcpConnecting;
    }

    /// `TcpConnecting -> Handshaking` once the transport is open and the
    /// I/O thread is running.
    pub fn enter_handshaking(&mut self, io: IoHandle) {
        self.io = Some(io);
        self.state = SessionState::Handshaking;
        self.handshake_started_at = Some(Instant::now());
    }

    /// `Handshaking -> Authenticating`: derives the shared symmetric key
    /// from the peer's public key.
    pub fn complete_handshake(&mut self, peer_pubkey: [u8; 32]) {
        self.crypto.shared = Some(self.crypto.keybox.derive_shared(peer_pubkey));
        self.state = SessionState::Authenticating;
    }

    /// `Authenticating -> Established`.
    pub fn complete_login(&mut self, account_id: i32, server_tps: u32) {
        self.account_id = Some(account_id);
        self.server_tps = server_tps.clamp(1, 240);
        self.state = SessionState::Established;
        self.backoff.reset();
        self.keep_alive = Some(KeepAlive::new(Instant::now()));
    }

    /// Any state -> Disconnected, on a fatal protocol/auth error or an
    /// explicit `disconnect()`.
    pub fn fail(&mut self, _err: &SessionError) {
        self.teardown();
    }

    pub fn disconnect(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(io) = self.io.take() {
            io.shutdown();
        }
        self.state = SessionState::Disconnected;
        self.account_id = None;
        self.crypto = SessionCrypto::new();
        self.keep_alive = None;
    }

    /// `Established -> Reconnecting` on a missed keep-alive.
    pub fn enter_reconnecting(&mut self) {
        if let Some(io) = self.io.take() {
            io.shutdown();
        }
        self.state = SessionState::Reconnecting;
    }

    /// Checks the handshake timeout (3s, `CONNECT_TIMEOUT`); call each tick
    /// while in `Handshaking`.
    pub fn handshake_timed_out(&self, now: Instant) -> bool {
        matches!(self.state, SessionState::Handshaking)
            && self
                .handshake_started_at
                .map(|at| now.duration_since(at) >= crate::transport::CONNECT_TIMEOUT)
                .unwrap_or(false)
    }

    /// Drives the keep-alive timer while `Established`; returns `true` if a
    /// ping should be sent now.
    pub fn tick_keepalive(&mut self, now: Instant) -> KeepAliveAction {
        let Some(keep_alive) = self.keep_alive.as_mut() else {
            return KeepAliveAction::None;
        };
        if keep_alive.is_dead(now) {
            return KeepAliveAction::Dead;
        }
        if keep_alive.should_send_ping(now) {
            keep_alive.record_ping_sent(now);
            return KeepAliveAction::SendPing;
        }
        KeepAliveAction::None
    }

    pub fn record_pong(&mut self, now: Instant) {
        if let Some(keep_alive) = self.keep_alive.as_mut() {
            keep_alive.record_pong(now);
        }
    }

    /// Records a failed reconnect attempt and returns whether the backoff
    /// window has since elapsed (`Reconnecting -> Resolving`).
    pub fn backoff_record_failure(&mut self, jitter: f32) {
        self.backoff.record_failure(Instant::now(), jitter);
    }

    pub fn ready_to_retry(&self) -> bool {
        self.state == SessionState::Reconnecting && self.backoff.is_ready(Instant::now())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    None,
    SendPing,
    Dead,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_to_established() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Disconnected);

        session.begin_connect();
        assert_eq!(session.state(), SessionState::Resolving);

        session.enter_tcp_connecting();
        assert_eq!(session.state(), SessionState::TcpConnecting);

        let (_tx, rx) = std::sync::mpsc::sync_channel(1);
        let (otx, _orx) = std::sync::mpsc::sync_channel(1);
        session.enter_handshaking(IoHandle { inbound: rx, outbound: otx, join: None });
        assert_eq!(session.state(), SessionState::Handshaking);

        session.complete_handshake([1u8; 32]);
        assert_eq!(session.state(), SessionState::Authenticating);
        assert!(session.crypto.shared.is_some());

        session.complete_login(42, 30);
        assert_eq!(session.state(), SessionState::Established);
        assert_eq!(session.account_id, Some(42));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = ReconnectBackoff::new();
        let now = Instant::now();
        backoff.record_failure(now, 1.0);
        let after_one = backoff.next_at;
        backoff.record_failure(now, 1.0);
        assert!(backoff.next_at > after_one);
        for _ in 0..10 {
            backoff.record_failure(now, 1.0);
        }
        assert!(backoff.next_at <= now + MAX_BACKOFF);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut session = Session::new();
        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn keepalive_with_no_established_session_does_nothing() {
        let mut session = Session::new();
        assert_eq!(session.tick_keepalive(Instant::now()), KeepAliveAction::None);
    }
}
