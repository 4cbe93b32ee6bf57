//! Client-origin packets (`1xxxx`). `x0xxx` connection, `x1xxx` gameplay,
//! `x2xxx` misc. See `SPEC_FULL.md` §3 for the id table.

use crate::codec::{ByteReader, ByteWriter, CodecError, Packet};
use crate::data::{PlayerIconData, PlayerState, RoomSettings};

/// Maximum account ids accepted in one `RequestProfiles` packet.
pub const MAX_PROFILES_REQUESTED: usize = 128;

pub struct Ping {
    pub client_time_ms: u64,
}

impl Packet for Ping {
    const ID: u16 = 10000;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_u64(self.client_time_ms);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            client_time_ms: r.read_u64()?,
        })
    }
}

pub struct CryptoHandshakeStart {
    pub client_pubkey: [u8; 32],
}

impl Packet for CryptoHandshakeStart {
    const ID: u16 = 10001;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_bytes_raw(&self.client_pubkey);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            client_pubkey: r.read_array::<32>()?,
        })
    }
}

pub struct ClientDisconnect;

impl Packet for ClientDisconnect {
    const ID: u16 = 10002;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, _w: &mut ByteWriter) {}

    fn decode_body(_r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

pub struct Login {
    pub totp: String,
}

impl Packet for Login {
    const ID: u16 = 10003;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.totp);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            totp: r.read_string()?,
        })
    }
}

pub struct SyncIcons {
    pub icons: PlayerIconData,
}

impl Packet for SyncIcons {
    const ID: u16 = 11000;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        self.icons.write(w);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            icons: PlayerIconData::read(r)?,
        })
    }
}

pub struct RequestProfiles {
    pub account_ids: Vec<i32>,
}

impl Packet for RequestProfiles {
    const ID: u16 = 11001;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_vec(&self.account_ids, |w, id| w.write_i32(*id));
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        let account_ids = r.read_vec(|r| r.read_i32())?;
        if account_ids.len() > MAX_PROFILES_REQUESTED {
            return Err(CodecError::Overflow {
                found: account_ids.len(),
                max: MAX_PROFILES_REQUESTED,
            });
        }
        Ok(Self { account_ids })
    }
}

pub struct LevelJoin {
    pub level_id: i32,
}

impl Packet for LevelJoin {
    const ID: u16 = 11002;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_i32(self.level_id);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            level_id: r.read_i32()?,
        })
    }
}

pub struct LevelLeave;

impl Packet for LevelLeave {
    const ID: u16 = 11003;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, _w: &mut ByteWriter) {}

    fn decode_body(_r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

pub struct PlayerData {
    pub state: PlayerState,
}

impl Packet for PlayerData {
    const ID: u16 = 11004;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        self.state.write(w);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            state: PlayerState::read(r)?,
        })
    }
}

pub struct RequestPlayerList;

impl Packet for RequestPlayerList {
    const ID: u16 = 11005;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, _w: &mut ByteWriter) {}

    fn decode_body(_r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

pub struct SyncPlayerMetadata {
    pub icons: PlayerIconData,
}

impl Packet for SyncPlayerMetadata {
    const ID: u16 = 11006;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        self.icons.write(w);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            icons: PlayerIconData::read(r)?,
        })
    }
}

pub struct Voice {
    pub frame: Vec<u8>,
}

impl Packet for Voice {
    const ID: u16 = 11010;
    const ENCRYPTED: bool = true;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_bytes(&self.frame);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            frame: r.read_bytes()?,
        })
    }
}

pub struct ChatMessage {
    pub message: String,
}

impl Packet for ChatMessage {
    const ID: u16 = 11011;
    const ENCRYPTED: bool = true;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_string(&self.message);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            message: r.read_string()?,
        })
    }
}

pub struct RoomJoin {
    pub room_id: u32,
    pub passcode: Option<String>,
}

impl Packet for RoomJoin {
    const ID: u16 = 11020;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_u32(self.room_id);
        w.write_option(&self.passcode, |w, p| w.write_string(p));
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            room_id: r.read_u32()?,
            passcode: r.read_option(|r| r.read_string())?,
        })
    }
}

pub struct RoomLeave;

impl Packet for RoomLeave {
    const ID: u16 = 11021;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, _w: &mut ByteWriter) {}

    fn decode_body(_r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

pub struct RoomCreate {
    pub settings: RoomSettings,
}

impl Packet for RoomCreate {
    const ID: u16 = 11022;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        self.settings.write(w);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            settings: RoomSettings::read(r)?,
        })
    }
}

pub struct RoomUpdateSettings {
    pub settings: RoomSettings,
}

impl Packet for RoomUpdateSettings {
    const ID: u16 = 11023;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        self.settings.write(w);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            settings: RoomSettings::read(r)?,
        })
    }
}

pub struct TeamChange {
    pub team_id: u8,
}

impl Packet for TeamChange {
    const ID: u16 = 11024;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_u8(self.team_id);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            team_id: r.read_u8()?,
        })
    }
}

pub struct RoomInvite {
    pub target_account_id: i32,
}

impl Packet for RoomInvite {
    const ID: u16 = 11025;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_i32(self.target_account_id);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            target_account_id: r.read_i32()?,
        })
    }
}

pub struct FireEvent {
    pub event_type: u16,
    /// Pre-encoded via `crate::data::event::encode_event_args`.
    pub args: Vec<u8>,
}

impl Packet for FireEvent {
    const ID: u16 = 11030;
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

pub struct ListenEvent {
    pub event_type: u16,
    pub group_id: u16,
}

impl Packet for ListenEvent {
    const ID: u16 = 11031;
    const ENCRYPTED: bool = false;

    fn encode_body(&self, w: &mut ByteWriter) {
        w.write_u16(self.event_type);
        w.write_u16(self.group_id);
    }

    fn decode_body(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            event_type: r.read_u16()?,
            group_id: r.read_u16()?,
        })
    }
}
