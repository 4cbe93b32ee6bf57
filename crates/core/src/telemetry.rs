//! Telemetry / Error Queue (`spec.md` §2 item 14, §7): deferred
//! diagnostics surfaced to `GameSurface`. Any thread may push; only the
//! main tick thread drains, once per tick.

use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Every error kind named in `spec.md` §7, unified so the queue and the
/// `Core`'s top-level `Result` can share one type.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
    #[error(transparent)]
    Session(#[from] crate::session::SessionError),
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),
    #[error(transparent)]
    Frame(#[from] crate::codec::FrameError),
    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),
    #[error("server disconnected: {0}")]
    ServerDisconnect(String),
    #[error("banned: {0}")]
    Banned(String),
    #[error("muted: {0}")]
    Muted(String),
    #[error("failed to join room: {0}")]
    RoomJoinFailed(String),
    #[error("failed to create room: {0}")]
    RoomCreateFailed(String),
    #[error("invalid configuration: {0}")]
    BadConfig(String),
    #[error("audio device unavailable: {0}")]
    AudioDeviceUnavailable(String),
}

/// A bounded, thread-safe queue of diagnostics. Pushing never blocks the
/// caller on anything but the queue's own lock; draining happens from the
/// main tick thread.
pub struct ErrorQueue {
    inner: Mutex<VecDeque<Diagnostic>>,
    capacity: usize,
}

impl ErrorQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    pub fn push_error(&self, err: &CoreError) {
        self.push(Severity::Error, err.to_string());
    }

    /// Drains everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<Diagnostic> {
        let mut queue = self.inner.lock().unwrap();
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_in_fifo_order() {
        let queue = ErrorQueue::new(16);
        queue.push(Severity::Debug, "first");
        queue.push(Severity::Warn, "second");
        let drained = queue.drain();
        assert_eq!(drained[0].message, "first");
        assert_eq!(drained[1].message, "second");
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let queue = ErrorQueue::new(2);
        queue.push(Severity::Debug, "a");
        queue.push(Severity::Debug, "b");
        queue.push(Severity::Debug, "c");
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "b");
        assert_eq!(drained[1].message, "c");
    }
}
