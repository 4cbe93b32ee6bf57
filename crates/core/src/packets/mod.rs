//! The packet-id registry: a compile-time table mapping id -> constructor
//! that decodes an incoming body into the right concrete type. Unknown ids
//! decode to [`AnyPacket::Unknown`] rather than erroring, per
//! `SPEC_FULL.md` §3/`spec.md` §4.1.

pub mod client;
pub mod server;

use crate::codec::{ByteReader, CodecError, Packet};

/// Packet-id category ranges, per `spec.md` §4.1: `1xxxx` client-origin,
/// `2xxxx` server-origin; within each, `x0xxx` connection, `x1xxx`
/// gameplay, `x2xxx` misc, `x9xxx` admin (reserved, unimplemented).
pub fn is_admin_category(id: u16) -> bool {
    (id % 10000) / 1000 == 9
}

/// A decoded inbound packet of any known type, or the drop sentinel for an
/// id the registry doesn't recognize.
pub enum AnyPacket {
    Ping(client::Ping),
    CryptoHandshakeStart(client::CryptoHandshakeStart),
    ClientDisconnect(client::ClientDisconnect),
    Login(client::Login),
    SyncIcons(client::SyncIcons),
    RequestProfiles(client::RequestProfiles),
    LevelJoin(client::LevelJoin),
    LevelLeave(client::LevelLeave),
    PlayerData(client::PlayerData),
    RequestPlayerList(client::RequestPlayerList),
    SyncPlayerMetadata(client::SyncPlayerMetadata),
    Voice(client::Voice),
    ChatMessage(client::ChatMessage),
    RoomJoin(client::RoomJoin),
    RoomLeave(client::RoomLeave),
    RoomCreate(client::RoomCreate),
    RoomUpdateSettings(client::RoomUpdateSettings),
    TeamChange(client::TeamChange),
    RoomInvite(client::RoomInvite),
    FireEvent(client::FireEvent),
    ListenEvent(client::ListenEvent),

    PingResponse(server::PingResponse),
    CryptoHandshakeResponse(server::CryptoHandshakeResponse),
    LoggedIn(server::LoggedIn),
    LoginFailed(server::LoginFailed),
    Banned(server::Banned),
    Muted(server::Muted),
    ServerDisconnect(server::ServerDisconnect),
    PlayerProfiles(server::PlayerProfiles),
    LevelData(server::LevelData),
    PlayerList(server::PlayerList),
    VoiceBroadcast(server::VoiceBroadcast),
    ChatMessageBroadcast(server::ChatMessageBroadcast),
    RoomState(server::RoomStatePacket),
    RoomJoinFailed(server::RoomJoinFailed),
    RoomCreateFailed(server::RoomCreateFailed),
    RoomInviteReceived(server::RoomInviteReceived),
    EventBroadcast(server::EventBroadcast),
    ServerNotice(server::ServerNotice),

    /// A well-formed frame whose id this registry has no constructor for.
    Unknown(u16),
}

macro_rules! dispatch {
    ($id:expr, $body:expr, $( $ty:ty => $variant:path ),+ $(,)?) => {
        match $id {
            $(<$ty as Packet>::ID => Ok($variant(<$ty as Packet>::decode_body(&mut ByteReader::new($body))?)),)+
            other => Ok(AnyPacket::Unknown(other)),
        }
    };
}

/// Decodes a packet body given its id, matching it against the
/// compile-time table above. Never panics: a decode failure on a known id
/// surfaces as a [`CodecError`]; an unrecognized id decodes to
/// [`AnyPacket::Unknown`].
pub fn decode_any(id: u16, body: &[u8]) -> Result<AnyPacket, CodecError> {
    dispatch!(id, body,
        client::Ping => AnyPacket::Ping,
        client::CryptoHandshakeStart => AnyPacket::CryptoHandshakeStart,
        client::ClientDisconnect => AnyPacket::ClientDisconnect,
        client::Login => AnyPacket::Login,
        client::SyncIcons => AnyPacket::SyncIcons,
        client::RequestProfiles => AnyPacket::RequestProfiles,
        client::LevelJoin => AnyPacket::LevelJoin,
        client::LevelLeave => AnyPacket::LevelLeave,
        client::PlayerData => AnyPacket::PlayerData,
        client::RequestPlayerList => AnyPacket::RequestPlayerList,
        client::SyncPlayerMetadata => AnyPacket::SyncPlayerMetadata,
        client::Voice => AnyPacket::Voice,
        client::ChatMessage => AnyPacket::ChatMessage,
        client::RoomJoin => AnyPacket::RoomJoin,
        client::RoomLeave => AnyPacket::RoomLeave,
        client::RoomCreate => AnyPacket::RoomCreate,
        client::RoomUpdateSettings => AnyPacket::RoomUpdateSettings,
        client::TeamChange => AnyPacket::TeamChange,
        client::RoomInvite => AnyPacket::RoomInvite,
        client::FireEvent => AnyPacket::FireEvent,
        client::ListenEvent => AnyPacket::ListenEvent,
        server::PingResponse => AnyPacket::PingResponse,
        server::CryptoHandshakeResponse => AnyPacket::CryptoHandshakeResponse,
        server::LoggedIn => AnyPacket::LoggedIn,
        server::LoginFailed => AnyPacket::LoginFailed,
        server::Banned => AnyPacket::Banned,
        server::Muted => AnyPacket::Muted,
        server::ServerDisconnect => AnyPacket::ServerDisconnect,
        server::PlayerProfiles => AnyPacket::PlayerProfiles,
        server::LevelData => AnyPacket::LevelData,
        server::PlayerList => AnyPacket::PlayerList,
        server::VoiceBroadcast => AnyPacket::VoiceBroadcast,
        server::ChatMessageBroadcast => AnyPacket::ChatMessageBroadcast,
        server::RoomStatePacket => AnyPacket::RoomState,
        server::RoomJoinFailed => AnyPacket::RoomJoinFailed,
        server::RoomCreateFailed => AnyPacket::RoomCreateFailed,
        server::RoomInviteReceived => AnyPacket::RoomInviteReceived,
        server::EventBroadcast => AnyPacket::EventBroadcast,
        server::ServerNotice => AnyPacket::ServerNotice,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_frame;

    #[test]
    fn unknown_id_decodes_to_sentinel_not_error() {
        let decoded = decode_any(65000, &[]).unwrap();
        assert!(matches!(decoded, AnyPacket::Unknown(65000)));
    }

    #[test]
    fn admin_category_ids_are_recognized() {
        assert!(is_admin_category(19000));
        assert!(is_admin_category(29000));
        assert!(!is_admin_category(11000));
    }

    #[test]
    fn full_frame_roundtrip_through_registry() {
        let packet = client::LevelJoin { level_id: 42 };
        let frame = encode_frame(&packet, None).unwrap();
        let (id, body) = crate::codec::open_frame(&frame, None).unwrap();
        match decode_any(id, &body).unwrap() {
            AnyPacket::LevelJoin(p) => assert_eq!(p.level_id, 42),
            _ => panic!("wrong variant"),
        }
    }
}
