//! Server-origin packets (`2xxxx`). See `SPEC_FULL.md` §3 for the id table.

use crate::codec::{ByteReader, ByteWriter, CodecError, Packet};
use crate::data::{ExtendedUserData, PlayerIconData, PlayerState, RoomState, SpecialUserData};

pub struct PingResponse {
    pub client_time_ms: u64,
    pub player_count: u32,
}

impl Packet for PingResponse {
    const ID: u16 = 20000;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_u64(self.client_time_ms);
        w.write_u32(self.player_count);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            client_time_ms: r.read_u64()?,
            player_count: r.read_u32()?,
        })
    }
}

pub struct CryptoHandshakeResponse {
    pub server_pubkey: [u8; 32],
    /// Server-declared secure mode (`spec.md` §4.3 "secure mode"): if set,
    /// `Login` must carry a TOTP derived from a freshly issued
    /// central-server authkey, or the client gives up with
    /// `SecureModeUnsupported` rather than sending a stale one.
    pub secure: bool,
}

impl Packet for CryptoHandshakeResponse {
    const ID: u16 = 20001;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_bytes_raw(&self.server_pubkey);
        w.write_bool(self.secure);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            server_pubkey: r.read_array::<32>()?,
            secure: r.read_bool()?,
        })
    }
}

pub struct LoggedIn {
    pub account_id: i32,
    pub server_tps: u32,
    /// Present only when the server is issuing a fresh token alongside
    /// this login, e.g. right after a role change (`spec.md` §3
    /// `ExtendedUserData`).
    pub extended: Option<ExtendedUserData>,
}

impl Packet for LoggedIn {
    const ID: u16 = 20002;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_i32(self.account_id);
        w.write_u32(self.server_tps);
        w.write_option(&self.extended, |w, data| data.write(w));
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            account_id: r.read_i32()?,
            server_tps: r.read_u32()?,
            extended: r.read_option(ExtendedUserData::read)?,
        })
    }
}

pub struct LoginFailed {
    pub reason: String,
}

impl Packet for LoginFailed {
    const ID: u16 = 20003;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.reason);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_string()?,
        })
    }
}

pub struct Banned {
    pub reason: String,
    pub expires_at_unix: i64,
}

impl Packet for Banned {
    const ID: u16 = 20004;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.reason);
        w.write_i64(self.expires_at_unix);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_string()?,
            expires_at_unix: r.read_i64()?,
        })
    }
}

pub struct Muted {
    pub reason: String,
    pub expires_at_unix: i64,
}

impl Packet for Muted {
    const ID: u16 = 20005;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.reason);
        w.write_i64(self.expires_at_unix);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_string()?,
            expires_at_unix: r.read_i64()?,
        })
    }
}

pub struct ServerDisconnect {
    pub reason: String,
}

impl Packet for ServerDisconnect {
    const ID: u16 = 20006;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.reason);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_string()?,
        })
    }
}

pub struct PlayerProfiles {
    pub profiles: Vec<(i32, PlayerIconData, SpecialUserData)>,
}

impl Packet for PlayerProfiles {
    const ID: u16 = 21000;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_vec(&self.profiles, |w, (id, icon, special)| {
            w.write_i32(*id);
            icon.write(w);
            special.write(w);
        });
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        let profiles = r.read_vec(|r| {
            Ok::<(i32, PlayerIconData, SpecialUserData), CodecError>((r.read_i32()?, PlayerIconData::read(r)?, SpecialUserData::read(r)?))
        })?;
        Ok(Self { profiles })
    }
}

pub struct LevelData {
    pub players: Vec<(i32, PlayerState)>,
}

impl Packet for LevelData {
    const ID: u16 = 21001;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_vec(&self.players, |w, (id, state)| {
            w.write_i32(*id);
            state.write(w);
        });
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        let players = r.read_vec(|r| Ok::<(i32, PlayerState), CodecError>((r.read_i32()?, PlayerState::read(r)?)))?;
        Ok(Self { players })
    }
}

pub struct PlayerList {
    pub players: Vec<i32>,
}

impl Packet for PlayerList {
    const ID: u16 = 21002;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_vec(&self.players, |w, id| w.write_i32(*id));
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            players: r.read_vec(|r| r.read_i32())?,
        })
    }
}

pub struct VoiceBroadcast {
    pub sender: i32,
    pub frame: Vec<u8>,
}

impl Packet for VoiceBroadcast {
    const ID: u16 = 21010;
    const ENCRYPTED: bool = true;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_i32(self.sender);
        w.write_bytes(&self.frame);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            sender: r.read_i32()?,
            frame: r.read_bytes()?,
        })
    }
}

pub struct ChatMessageBroadcast {
    pub sender: i32,
    pub message: String,
}

impl Packet for ChatMessageBroadcast {
    const ID: u16 = 21011;
    const ENCRYPTED: bool = true;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_i32(self.sender);
        w.write_string(&self.message);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            sender: r.read_i32()?,
            message: r.read_string()?,
        })
    }
}

pub struct RoomStatePacket {
    pub room: RoomState,
}

impl Packet for RoomStatePacket {
    const ID: u16 = 21020;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        self.room.write(w);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            room: RoomState::read(r)?,
        })
    }
}

pub struct RoomJoinFailed {
    pub reason: String,
}

impl Packet for RoomJoinFailed {
    const ID: u16 = 21021;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.reason);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_string()?,
        })
    }
}

pub struct RoomCreateFailed {
    pub reason: String,
}

impl Packet for RoomCreateFailed {
    const ID: u16 = 21022;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.reason);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            reason: r.read_string()?,
        })
    }
}

pub struct RoomInviteReceived {
    pub from_account_id: i32,
    pub room_id: u32,
}

impl Packet for RoomInviteReceived {
    const ID: u16 = 21023;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_i32(self.from_account_id);
        w.write_u32(self.room_id);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            from_account_id: r.read_i32()?,
            room_id: r.read_u32()?,
        })
    }
}

pub struct EventBroadcast {
    pub event_type: u16,
    pub args: Vec<u8>,
}

impl Packet for EventBroadcast {
    const ID: u16 = 21030;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_u16(self.event_type);
        w.write_bytes(&self.args);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            event_type: r.read_u16()?,
            args: r.read_bytes()?,
        })
    }
}

pub struct ServerNotice {
    pub text: String,
    pub icon: u8,
    pub seconds: f32,
}

impl Packet for ServerNotice {
    const ID: u16 = 21040;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.text);
        w.write_u8(self.icon);
        w.write_f32(self.seconds);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            text: r.read_string()?,
            icon: r.read_u8()?,
            seconds: r.read_f32()?,
        })
    }
}
