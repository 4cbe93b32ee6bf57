//! The background network I/O thread (`SPEC_FULL.md` §5): owns the
//! [`Transport`], runs the poll loop, and hands inbound frames to the main
//! tick thread over a bounded MPSC channel. The main thread never blocks on
//! I/O; it drains with `try_recv` each tick.

use std::net::SocketAddr;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use super::socket::{PollEvent, Transport};
use super::TransportError;

/// Capacity of both the inbound and outbound channels. Sized well above
/// one tick's worth of traffic at the sender's max TPS (240) so a brief
/// stall doesn't immediately drop frames.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum InboundFrame {
    Reliable(Vec<u8>),
    Datagram(Vec<u8>),
    /// The transport hit a fatal error; the thread exits after sending this.
    Closed(String),
}

#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Reliable(Vec<u8>),
    Datagram(Vec<u8>),
    Shutdown,
}

/// The main thread's handle to a running I/O thread: channel endpoints plus
/// the `JoinHandle` so `disconnect()` can wait for a clean exit.
pub struct IoHandle {
    pub inbound: Receiver<InboundFrame>,
    pub outbound: SyncSender<OutboundFrame>,
    pub(crate) join: Option<JoinHandle<()>>,
}

impl IoHandle {
    /// Non-blocking drain of everything currently queued, for the main
    /// thread's per-tick read.
    pub fn try_recv_all(&self) -> Vec<InboundFrame> {
        let mut out = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(frame) => out.push(frame),
                Err(_) => break,
            }
        }
        out
    }

    /// Queues an outbound frame; backpressures (drops with a log, per
    /// §4.2 "on would-block the outbound queue backpressures the sender")
    /// rather than blocking the main thread if the channel is full.
    pub fn send_reliable(&self, bytes: Vec<u8>) {
        if let Err(TrySendError::Full(_)) = self.outbound.try_send(OutboundFrame::Reliable(bytes)) {
            log::warn!("outbound reliable queue full, dropping frame");
        }
    }

    pub fn send_datagram(&self, bytes: Vec<u8>) {
        if let Err(TrySendError::Full(_)) = self.outbound.try_send(OutboundFrame::Datagram(bytes)) {
            log::warn!("outbound datagram queue full, dropping frame");
        }
    }

    pub fn shutdown(mut self) {
        let _ = self.outbound.send(OutboundFrame::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns the I/O thread driving `transport`'s poll loop. Returns a handle
/// usable from the main thread immediately.
pub fn spawn_io_thread(mut transport: Transport) -> IoHandle {
    let (inbound_tx, inbound_rx) = sync_channel(CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = sync_channel::<OutboundFrame>(CHANNEL_CAPACITY);

    let join = std::thread::Builder::new()
        .name("globed-io".into())
        .spawn(move || io_loop(&mut transport, &inbound_tx, &outbound_rx))
        .expect("failed to spawn network I/O thread");

    IoHandle {
        inbound: inbound_rx,
        outbound: outbound_tx,
        join: Some(join),
    }
}

fn io_loop(transport: &mut Transport, inbound: &SyncSender<InboundFrame>, outbound: &Receiver<OutboundFrame>) {
    loop {
        match outbound.recv_timeout(Duration::from_millis(5)) {
            Ok(OutboundFrame::Reliable(bytes)) => {
                if let Err(e) = transport.send_reliable(&bytes) {
                    let _ = inbound.send(InboundFrame::Closed(e.to_string()));
                    return;
                }
            }
            Ok(OutboundFrame::Datagram(bytes)) => {
                if let Err(e) = transport.send_datagram(&bytes) {
                    log::warn!("datagram send failed: {e}");
                }
            }
            Ok(OutboundFrame::Shutdown) => return,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        match transport.poll(Duration::from_millis(0)) {
            Ok(events) => {
                for event in events {
                    let frame = match event {
                        PollEvent::Reliable(bytes) => InboundFrame::Reliable(bytes),
                        PollEvent::Datagram(bytes) => InboundFrame::Datagram(bytes),
                    };
                    if inbound.send(frame).is_err() {
                        return;
                    }
                }
            }
            Err(e @ TransportError::ConnectionClosed) | Err(e @ TransportError::SocketError(_)) => {
                let _ = inbound.send(InboundFrame::Closed(e.to_string()));
                return;
            }
            Err(_) => {}
        }
    }
}

pub fn resolve_and_connect(
    host_port: &str,
    resolve_cache: &mut super::ResolveCache,
    timeout: Duration,
) -> Result<Transport, TransportError> {
    let addrs = resolve_cache.resolve(host_port)?;
    let addr: SocketAddr = addrs[0];
    Transport::connect(addr, addr, timeout)
}
