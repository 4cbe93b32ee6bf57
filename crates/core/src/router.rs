//! Packet router & listeners (`SPEC_FULL.md` §4.4): id -> handler
//! dispatch in priority order, an outbound send path that seals encrypted
//! packets, and cancellable listener handles.

use std::collections::HashMap;

use crate::codec::{encode_frame, FrameError, Packet};
use crate::crypto::SymmetricBox;
use crate::packets::AnyPacket;

/// Whether a handler's return stops further dispatch for that packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

type Handler = Box<dyn FnMut(&AnyPacket) -> Flow + Send>;

struct Listener {
    id: u64,
    priority: i32,
    handler: Handler,
}

/// Dispatches decoded packets to registered listeners in priority order
/// (lower first). Registration changes are only observed between packets
/// (`SPEC_FULL.md` §4.4 cancellation rule): a listener removed mid-dispatch
/// still finishes running for the packet currently being dispatched.
#[derive(Default)]
pub struct Router {
    listeners: HashMap<u16, Vec<Listener>>,
    next_id: u64,
    pending_removals: Vec<(u16, u64)>,
}

/// A registration token; dropping it does not unregister (explicit
/// `Router::unregister` does, matching the "handle's drop/destroy"
/// language literally but keeping ownership simple for a single-threaded
/// dispatcher with no async drop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle {
    packet_id: u16,
    id: u64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for packets of id `P::ID`, run at `priority`
    /// (lower runs earlier).
    pub fn listen<P, F>(&mut self, priority: i32, mut handler: F) -> ListenerHandle
    where
        P: Packet,
        F: FnMut(&P) -> Flow + Send + 'static,
        AnyPacket: ExtractPacket<P>,
    {
        let id = self.next_id;
        self.next_id += 1;

        let wrapped: Handler = Box::new(move |any| match AnyPacket::extract(any) {
            Some(p) => handler(p),
            None => Flow::Continue,
        });

        let entry = self.listeners.entry(P::ID).or_default();
        entry.push(Listener {
            id,
            priority,
            handler: wrapped,
        });
        entry.sort_by_key(|l| l.priority);

        ListenerHandle { packet_id: P::ID, id }
    }

    pub fn unregister(&mut self, handle: ListenerHandle) {
        self.pending_removals.push((handle.packet_id, handle.id));
        self.apply_pending_removals();
    }

    fn apply_pending_removals(&mut self) {
        for (packet_id, id) in self.pending_removals.drain(..) {
            if let Some(listeners) = self.listeners.get_mut(&packet_id) {
                listeners.retain(|l| l.id != id);
            }
        }
    }

    /// Dispatches one decoded packet through its listeners in priority
    /// order, stopping early on [`Flow::Stop`].
    pub fn dispatch(&mut self, packet_id: u16, any: &AnyPacket) {
        if let Some(listeners) = self.listeners.get_mut(&packet_id) {
            for listener in listeners.iter_mut() {
                if (listener.handler)(any) == Flow::Stop {
                    break;
                }
            }
        }
        self.apply_pending_removals();
    }
}

/// Narrows a decoded [`AnyPacket`] back to its concrete type for a typed
/// listener. One impl per packet type, mirroring the registry's dispatch
/// macro rather than a runtime downcast.
pub trait ExtractPacket<P> {
    fn extract(any: &Self) -> Option<&P>;
}

macro_rules! impl_extract {
    ($ty:ty, $variant:path) => {
        impl ExtractPacket<$ty> for AnyPacket {
            fn extract(any: &Self) -> Option<&$ty> {
                match any {
                    $variant(p) => Some(p),
                    _ => None,
                }
            }
        }
    };
}

use crate::packets::{client, server};

impl_extract!(client::Ping, AnyPacket::Ping);
impl_extract!(client::CryptoHandshakeStart, AnyPacket::CryptoHandshakeStart);
impl_extract!(client::ClientDisconnect, AnyPacket::ClientDisconnect);
impl_extract!(client::Login, AnyPacket::Login);
impl_extract!(client::SyncIcons, AnyPacket::SyncIcons);
impl_extract!(client::RequestProfiles, AnyPacket::RequestProfiles);
impl_extract!(client::LevelJoin, AnyPacket::LevelJoin);
impl_extract!(client::LevelLeave, AnyPacket::LevelLeave);
impl_extract!(client::PlayerData, AnyPacket::PlayerData);
impl_extract!(client::RequestPlayerList, AnyPacket::RequestPlayerList);
impl_extract!(client::SyncPlayerMetadata, AnyPacket::SyncPlayerMetadata);
impl_extract!(client::Voice, AnyPacket::Voice);
impl_extract!(client::ChatMessage, AnyPacket::ChatMessage);
impl_extract!(client::RoomJoin, AnyPacket::RoomJoin);
impl_extract!(client::RoomLeave, AnyPacket::RoomLeave);
impl_extract!(client::RoomCreate, AnyPacket::RoomCreate);
impl_extract!(client::RoomUpdateSettings, AnyPacket::RoomUpdateSettings);
impl_extract!(client::TeamChange, AnyPacket::TeamChange);
impl_extract!(client::RoomInvite, AnyPacket::RoomInvite);
impl_extract!(client::FireEvent, AnyPacket::FireEvent);
impl_extract!(client::ListenEvent, AnyPacket::ListenEvent);

impl_extract!(server::PingResponse, AnyPacket::PingResponse);
impl_extract!(server::CryptoHandshakeResponse, AnyPacket::CryptoHandshakeResponse);
impl_extract!(server::LoggedIn, AnyPacket::LoggedIn);
impl_extract!(server::LoginFailed, AnyPacket::LoginFailed);
impl_extract!(server::Banned, AnyPacket::Banned);
impl_extract!(server::Muted, AnyPacket::Muted);
impl_extract!(server::ServerDisconnect, AnyPacket::ServerDisconnect);
impl_extract!(server::PlayerProfiles, AnyPacket::PlayerProfiles);
impl_extract!(server::LevelData, AnyPacket::LevelData);
impl_extract!(server::PlayerList, AnyPacket::PlayerList);
impl_extract!(server::VoiceBroadcast, AnyPacket::VoiceBroadcast);
impl_extract!(server::ChatMessageBroadcast, AnyPacket::ChatMessageBroadcast);
impl_extract!(server::RoomStatePacket, AnyPacket::RoomState);
impl_extract!(server::RoomJoinFailed, AnyPacket::RoomJoinFailed);
impl_extract!(server::RoomCreateFailed, AnyPacket::RoomCreateFailed);
impl_extract!(server::RoomInviteReceived, AnyPacket::RoomInviteReceived);
impl_extract!(server::EventBroadcast, AnyPacket::EventBroadcast);
impl_extract!(server::ServerNotice, AnyPacket::ServerNotice);

/// Outbound path: seals encrypted packets with the session key (once
/// established) and hands the frame to the caller to enqueue on the I/O
/// thread. Returns `None` and drops the packet if the session has no
/// established key yet and the packet requires one.
pub fn prepare_outbound<P: Packet>(packet: &P, key: Option<&SymmetricBox>) -> Result<Vec<u8>, FrameError> {
    encode_frame(packet, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::client::LevelJoin;
    use std::sync::{Arc, Mutex};

    #[test]
    fn listeners_run_in_priority_order() {
        let mut router = Router::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = order.clone();
        router.listen::<LevelJoin, _>(10, move |_| {
            order_a.lock().unwrap().push("second");
            Flow::Continue
        });
        let order_b = order.clone();
        router.listen::<LevelJoin, _>(0, move |_| {
            order_b.lock().unwrap().push("first");
            Flow::Continue
        });

        let packet = AnyPacket::LevelJoin(LevelJoin { level_id: 1 });
        router.dispatch(LevelJoin::ID, &packet);

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn stop_halts_further_dispatch() {
        let mut router = Router::new();
        let calls = Arc::new(Mutex::new(0));

        router.listen::<LevelJoin, _>(0, |_| Flow::Stop);
        let calls_b = calls.clone();
        router.listen::<LevelJoin, _>(1, move |_| {
            *calls_b.lock().unwrap() += 1;
            Flow::Continue
        });

        let packet = AnyPacket::LevelJoin(LevelJoin { level_id: 1 });
        router.dispatch(LevelJoin::ID, &packet);

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn unregistered_listener_does_not_fire() {
        let mut router = Router::new();
        let calls = Arc::new(Mutex::new(0));
        let calls_b = calls.clone();
        let handle = router.listen::<LevelJoin, _>(0, move |_| {
            *calls_b.lock().unwrap() += 1;
            Flow::Continue
        });
        router.unregister(handle);

        let packet = AnyPacket::LevelJoin(LevelJoin { level_id: 1 });
        router.dispatch(LevelJoin::ID, &packet);

        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
