use super::session_id::SessionId;
use crate::codec::{ByteReader, ByteWriter, CodecError};

/// Per-room feature toggles. `server_id = 0` means "use the active central
/// server's preferred game-server id" (see `directory` for selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoomSettings {
    pub server_id: u8,
    pub player_limit: u16,
    pub faster_reset: bool,
    pub hidden: bool,
    pub private_invites: bool,
    pub is_follower: bool,
    pub level_integrity: bool,
    pub teams: bool,
    pub locked_teams: bool,
    pub manual_pinning: bool,
    pub collision: bool,
    pub two_player_mode: bool,
    pub deathlink: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            server_id: 0,
            player_limit: 0,
            faster_reset: false,
            hidden: false,
            private_invites: false,
            is_follower: false,
            level_integrity: false,
            teams: false,
            locked_teams: false,
            manual_pinning: false,
            collision: false,
            two_player_mode: false,
            deathlink: false,
        }
    }
}

impl RoomSettings {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_u8(self.server_id);
        w.write_u16(self.player_limit);
        w.write_bool(self.faster_reset);
        w.write_bool(self.hidden);
        w.write_bool(self.private_invites);
        w.write_bool(self.is_follower);
        w.write_bool(self.level_integrity);
        w.write_bool(self.teams);
        w.write_bool(self.locked_teams);
        w.write_bool(self.manual_pinning);
        w.write_bool(self.collision);
        w.write_bool(self.two_player_mode);
        w.write_bool(self.deathlink);
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            server_id: r.read_u8()?,
            player_limit: r.read_u16()?,
            faster_reset: r.read_bool()?,
            hidden: r.read_bool()?,
            private_invites: r.read_bool()?,
            is_follower: r.read_bool()?,
            level_integrity: r.read_bool()?,
            teams: r.read_bool()?,
            locked_teams: r.read_bool()?,
            manual_pinning: r.read_bool()?,
            collision: r.read_bool()?,
            two_player_mode: r.read_bool()?,
            deathlink: r.read_bool()?,
        })
    }
}

/// A single team within a room; valid only when `RoomSettings::teams` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoomTeam {
    pub id: u8,
    pub color: u32,
    pub order: u8,
}

impl RoomTeam {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_u8(self.id);
        w.write_u32(self.color);
        w.write_u8(self.order);
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            id: r.read_u8()?,
            color: r.read_u32()?,
            order: r.read_u8()?,
        })
    }
}

/// In-memory representation of the single active room (the "global room"
/// has `room_id == 0`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomState {
    pub room_id: u32,
    pub room_owner: i32,
    pub room_name: String,
    pub passcode: Option<String>,
    pub pinned_level: SessionId,
    pub settings: RoomSettings,
    pub teams: Vec<RoomTeam>,
    /// account id -> team id
    pub team_members: std::collections::HashMap<i32, u8>,
}

impl RoomState {
    pub fn is_global(&self) -> bool {
        self.room_id == 0
    }

    /// Returns the team id for `account_id`, or `None` if teams are disabled
    /// or the player has no assignment.
    pub fn team_of(&self, account_id: i32) -> Option<u8> {
        if !self.settings.teams {
            return None;
        }
        self.team_members.get(&account_id).copied()
    }

    pub fn set_team(&mut self, account_id: i32, team_id: u8) -> bool {
        if !self.settings.teams || !self.teams.iter().any(|t| t.id == team_id) {
            return false;
        }
        self.team_members.insert(account_id, team_id);
        true
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.write_u32(self.room_id);
        w.write_i32(self.room_owner);
        w.write_string(&self.room_name);
        w.write_option(&self.passcode, |w, p| w.write_string(p));
        self.pinned_level.write(w);
        self.settings.write(w);
        w.write_vec(&self.teams, |w, t| t.write(w));
        let members: Vec<(i32, u8)> = self.team_members.iter().map(|(k, v)| (*k, *v)).collect();
        w.write_vec(&members, |w, (account_id, team_id)| {
            w.write_i32(*account_id);
            w.write_u8(*team_id);
        });
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        let room_id = r.read_u32()?;
        let room_owner = r.read_i32()?;
        let room_name = r.read_string()?;
        let passcode = r.read_option(|r| r.read_string())?;
        let pinned_level = SessionId::read(r)?;
        let settings = RoomSettings::read(r)?;
        let teams = r.read_vec(RoomTeam::read)?;
        let members = r.read_vec(|r| Ok::<(i32, u8), CodecError>((r.read_i32()?, r.read_u8()?)))?;
        Ok(Self {
            room_id,
            room_owner,
            room_name,
            passcode,
            pinned_level,
            settings,
            teams,
            team_members: members.into_iter().collect(),
        })
    }
}

/// One non-empty list of colors animated either by a repeating tint cycle
/// or by a gradient keyed on a `[0,1]` position.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiColor {
    kind: MultiColorKind,
    colors: Vec<(u8, u8, u8)>,
    phase: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultiColorKind {
    Static,
    Tinting,
    Gradient,
}

impl MultiColor {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let kind = match bytes[0] {
            0 => MultiColorKind::Static,
            1 => MultiColorKind::Tinting,
            2 => MultiColorKind::Gradient,
            _ => return None,
        };
        let rest = &bytes[1..];
        if rest.len() % 3 != 0 || rest.is_empty() {
            return None;
        }
        let colors = rest
            .chunks_exact(3)
            .map(|c| (c[0], c[1], c[2]))
            .collect::<Vec<_>>();
        Some(Self {
            kind,
            colors,
            phase: 0.0,
        })
    }

    pub fn is_multiple(&self) -> bool {
        self.colors.len() > 1
    }

    pub fn colors(&self) -> &[(u8, u8, u8)] {
        &self.colors
    }

    /// Inverse of [`MultiColor::decode`]: kind byte followed by the flat
    /// `(r, g, b)` list.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.colors.len() * 3);
        bytes.push(match self.kind {
            MultiColorKind::Static => 0,
            MultiColorKind::Tinting => 1,
            MultiColorKind::Gradient => 2,
        });
        for (r, g, b) in &self.colors {
            bytes.extend_from_slice(&[*r, *g, *b]);
        }
        bytes
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(&self.encode());
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        let bytes = r.read_bytes()?;
        Self::decode(&bytes).ok_or(CodecError::BadMultiColor)
    }

    /// Advances the internal tint-cycle phase clock; a no-op for gradients.
    pub fn on_tick(&mut self, dt: f32) {
        if self.kind == MultiColorKind::Tinting {
            self.phase = (self.phase + dt) % self.colors.len().max(1) as f32;
        }
    }

    /// Evaluates the color at normalized position `t` for gradients, or at
    /// the component's own internal phase clock for tinting/static.
    pub fn color_at(&self, t: f32) -> (u8, u8, u8) {
        match self.kind {
            MultiColorKind::Static => self.colors.first().copied().unwrap_or((255, 255, 255)),
            MultiColorKind::Tinting => {
                let idx = self.phase.floor() as usize % self.colors.len().max(1);
                self.colors.get(idx).copied().unwrap_or((255, 255, 255))
            }
            MultiColorKind::Gradient => {
                let t = t.clamp(0.0, 1.0);
                if self.colors.len() == 1 {
                    return self.colors[0];
                }
                let segment = t * (self.colors.len() - 1) as f32;
                let i = segment.floor() as usize;
                let frac = segment - i as f32;
                let a = self.colors[i.min(self.colors.len() - 1)];
                let b = self.colors[(i + 1).min(self.colors.len() - 1)];
                let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac) as u8;
                (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_zero_is_global() {
        let room = RoomState::default();
        assert!(room.is_global());
    }

    #[test]
    fn room_state_wire_roundtrip() {
        let mut room = RoomState {
            room_id: 7,
            room_owner: 42,
            room_name: "cool room".into(),
            passcode: Some("1234".into()),
            pinned_level: SessionId::from_parts(3, 7, 555),
            settings: RoomSettings {
                teams: true,
                ..Default::default()
            },
            teams: vec![RoomTeam {
                id: 1,
                color: 0xff0000,
                order: 0,
            }],
            ..Default::default()
        };
        room.set_team(42, 1);

        let mut w = ByteWriter::new();
        room.write(&mut w);
        let bytes = w.into_bytes();
        let decoded = RoomState::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded, room);
    }

    #[test]
    fn team_assignment_requires_teams_enabled_and_known_team() {
        let mut room = RoomState {
            settings: RoomSettings {
                teams: true,
                ..Default::default()
            },
            teams: vec![RoomTeam {
                id: 1,
                color: 0xff0000,
                order: 0,
            }],
            ..Default::default()
        };
        assert!(!room.set_team(5, 2));
        assert!(room.set_team(5, 1));
        assert_eq!(room.team_of(5), Some(1));
    }

    #[test]
    fn multicolor_gradient_interpolates() {
        let mc = MultiColor::decode(&[2, 0, 0, 0, 255, 255, 255]).unwrap();
        assert!(mc.is_multiple());
        assert_eq!(mc.color_at(0.0), (0, 0, 0));
        assert_eq!(mc.color_at(1.0), (255, 255, 255));
    }

    #[test]
    fn multicolor_rejects_malformed_bytes() {
        assert!(MultiColor::decode(&[0, 1, 2]).is_none());
        assert!(MultiColor::decode(&[]).is_none());
    }

    #[test]
    fn multicolor_wire_roundtrip() {
        let mc = MultiColor::decode(&[1, 255, 0, 0, 0, 255, 0]).unwrap();
        let mut w = ByteWriter::new();
        mc.write(&mut w);
        let bytes = w.into_bytes();
        let decoded = MultiColor::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded, mc);
    }
}
