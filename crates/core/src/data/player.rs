//! Per-player cosmetic and per-frame data, laid out to match the wire
//! format of the existing game server (see `SPEC_FULL.md` §4).

use crate::codec::{ByteReader, ByteWriter, CodecError};

/// Sentinel for "no glow color" on [`PlayerIconData::glow_color`].
pub const NO_GLOW: u16 = 65535;
/// Sentinel for "no trail" on [`PlayerIconData::trail`].
pub const NO_TRAIL: u8 = 255;

/// Per-player cosmetic set: vehicle indices, colors, trail and death effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlayerIconData {
    pub cube: i16,
    pub ship: i16,
    pub ball: i16,
    pub ufo: i16,
    pub wave: i16,
    pub robot: i16,
    pub spider: i16,
    pub swing: i16,
    pub jetpack: i16,
    pub color1: u16,
    pub color2: u16,
    /// `NO_GLOW` means "no glow color".
    pub glow_color: u16,
    pub death_effect: u8,
    /// `NO_TRAIL` means "no trail".
    pub trail: u8,
    pub ship_trail: u8,
}

impl Default for PlayerIconData {
    fn default() -> Self {
        Self {
            cube: 1,
            ship: 1,
            ball: 1,
            ufo: 1,
            wave: 1,
            robot: 1,
            spider: 1,
            swing: 1,
            jetpack: 1,
            color1: 0,
            color2: 3,
            glow_color: NO_GLOW,
            death_effect: 1,
            trail: NO_TRAIL,
            ship_trail: 0,
        }
    }
}

impl PlayerIconData {
    pub fn has_glow(&self) -> bool {
        self.glow_color != NO_GLOW
    }

    pub fn has_trail(&self) -> bool {
        self.trail != NO_TRAIL
    }
}

/// Vehicle type a `PlayerObjectData` snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum PlayerIconType {
    Unknown = 0,
    Cube = 1,
    Ship = 2,
    Ball = 3,
    Ufo = 4,
    Wave = 5,
    Robot = 6,
    Spider = 7,
    Swing = 8,
    Jetpack = 9,
}

impl PlayerIconType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Cube,
            2 => Self::Ship,
            3 => Self::Ball,
            4 => Self::Ufo,
            5 => Self::Wave,
            6 => Self::Robot,
            7 => Self::Spider,
            8 => Self::Swing,
            9 => Self::Jetpack,
            _ => Self::Unknown,
        }
    }
}

/// Bandwidth-gated physics detail, carried only when the sender opts in.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtendedPlayerData {
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub accelerating: bool,
    pub acceleration: f32,
    pub fall_start_y: f32,
    pub is_on_ground_2: bool,
    pub gravity_mod: f32,
    pub gravity: f32,
}

/// Per-vehicle frame snapshot for one of a player's two possible sub-players.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerObjectData {
    pub position: (f32, f32),
    pub rotation: f32,
    pub icon_type: PlayerIconType,
    pub is_visible: bool,
    pub is_looking_left: bool,
    pub is_upside_down: bool,
    pub is_dashing: bool,
    pub is_mini: bool,
    pub is_grounded: bool,
    pub is_stationary: bool,
    pub is_falling: bool,
    pub is_rotating: bool,
    pub is_sideways: bool,
    pub extended: Option<ExtendedPlayerData>,
}

impl Default for PlayerObjectData {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0),
            rotation: 0.0,
            icon_type: PlayerIconType::Cube,
            is_visible: true,
            is_looking_left: false,
            is_upside_down: false,
            is_dashing: false,
            is_mini: false,
            is_grounded: false,
            is_stationary: false,
            is_falling: false,
            is_rotating: false,
            is_sideways: false,
            extended: None,
        }
    }
}

impl PlayerObjectData {
    /// Copies the boolean flag set from `other`, leaving position/rotation/extended untouched.
    pub fn copy_flags_from(&mut self, other: &PlayerObjectData) {
        self.is_visible = other.is_visible;
        self.is_looking_left = other.is_looking_left;
        self.is_upside_down = other.is_upside_down;
        self.is_dashing = other.is_dashing;
        self.is_mini = other.is_mini;
        self.is_grounded = other.is_grounded;
        self.is_stationary = other.is_stationary;
        self.is_falling = other.is_falling;
        self.is_rotating = other.is_rotating;
        self.is_sideways = other.is_sideways;
    }
}

/// Composite per-frame snapshot sent at the configured TPS by the
/// Player-State Sender and broadcast back down as part of `LevelData`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerState {
    pub account_id: i32,
    /// Server time at emission, monotonic within a session.
    pub timestamp: f32,
    /// Send-counter mod 256; lets the interpolator detect gaps.
    pub frame_number: u8,
    pub death_count: u8,
    pub percentage: u16,
    pub is_dead: bool,
    pub is_paused: bool,
    pub is_practicing: bool,
    pub is_in_editor: bool,
    pub is_editor_building: bool,
    pub is_last_death_real: bool,
    pub player1: Option<PlayerObjectData>,
    pub player2: Option<PlayerObjectData>,
}

impl PlayerState {
    pub fn progress(&self) -> f32 {
        self.percentage as f32 / 65535.0
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            account_id: 0,
            timestamp: 0.0,
            frame_number: 0,
            death_count: 0,
            percentage: 0,
            is_dead: false,
            is_paused: false,
            is_practicing: false,
            is_in_editor: false,
            is_editor_building: false,
            is_last_death_real: false,
            player1: None,
            player2: None,
        }
    }
}

impl PlayerIconData {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_i16(self.cube);
        w.write_i16(self.ship);
        w.write_i16(self.ball);
        w.write_i16(self.ufo);
        w.write_i16(self.wave);
        w.write_i16(self.robot);
        w.write_i16(self.spider);
        w.write_i16(self.swing);
        w.write_i16(self.jetpack);
        w.write_u16(self.color1);
        w.write_u16(self.color2);
        w.write_u16(self.glow_color);
        w.write_u8(self.death_effect);
        w.write_u8(self.trail);
        w.write_u8(self.ship_trail);
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            cube: r.read_i16()?,
            ship: r.read_i16()?,
            ball: r.read_i16()?,
            ufo: r.read_i16()?,
            wave: r.read_i16()?,
            robot: r.read_i16()?,
            spider: r.read_i16()?,
            swing: r.read_i16()?,
            jetpack: r.read_i16()?,
            color1: r.read_u16()?,
            color2: r.read_u16()?,
            glow_color: r.read_u16()?,
            death_effect: r.read_u8()?,
            trail: r.read_u8()?,
            ship_trail: r.read_u8()?,
        })
    }
}

impl ExtendedPlayerData {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_f32(self.velocity_x);
        w.write_f32(self.velocity_y);
        w.write_bool(self.accelerating);
        w.write_f32(self.acceleration);
        w.write_f32(self.fall_start_y);
        w.write_bool(self.is_on_ground_2);
        w.write_f32(self.gravity_mod);
        w.write_f32(self.gravity);
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            velocity_x: r.read_f32()?,
            velocity_y: r.read_f32()?,
            accelerating: r.read_bool()?,
            acceleration: r.read_f32()?,
            fall_start_y: r.read_f32()?,
            is_on_ground_2: r.read_bool()?,
            gravity_mod: r.read_f32()?,
            gravity: r.read_f32()?,
        })
    }
}

impl PlayerObjectData {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_f32(self.position.0);
        w.write_f32(self.position.1);
        w.write_f32(self.rotation);
        w.write_u8(self.icon_type as u8);
        w.write_bool(self.is_visible);
        w.write_bool(self.is_looking_left);
        w.write_bool(self.is_upside_down);
        w.write_bool(self.is_dashing);
        w.write_bool(self.is_mini);
        w.write_bool(self.is_grounded);
        w.write_bool(self.is_stationary);
        w.write_bool(self.is_falling);
        w.write_bool(self.is_rotating);
        w.write_bool(self.is_sideways);
        w.write_option(&self.extended, |w, ext| ext.write(w));
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        let position = (r.read_f32()?, r.read_f32()?);
        let rotation = r.read_f32()?;
        let icon_type = PlayerIconType::from_u8(r.read_u8()?);
        Ok(Self {
            position,
            rotation,
            icon_type,
            is_visible: r.read_bool()?,
            is_looking_left: r.read_bool()?,
            is_upside_down: r.read_bool()?,
            is_dashing: r.read_bool()?,
            is_mini: r.read_bool()?,
            is_grounded: r.read_bool()?,
            is_stationary: r.read_bool()?,
            is_falling: r.read_bool()?,
            is_rotating: r.read_bool()?,
            is_sideways: r.read_bool()?,
            extended: r.read_option(ExtendedPlayerData::read)?,
        })
    }
}

impl PlayerState {
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_i32(self.account_id);
        w.write_f32(self.timestamp);
        w.write_u8(self.frame_number);
        w.write_u8(self.death_count);
        w.write_u16(self.percentage);
        w.write_bool(self.is_dead);
        w.write_bool(self.is_paused);
        w.write_bool(self.is_practicing);
        w.write_bool(self.is_in_editor);
        w.write_bool(self.is_editor_building);
        w.write_bool(self.is_last_death_real);
        w.write_option(&self.player1, |w, p| p.write(w));
        w.write_option(&self.player2, |w, p| p.write(w));
    }

    pub fn read(r: &mut ByteReader) -> Result<Self, CodecError> {
        Ok(Self {
            account_id: r.read_i32()?,
            timestamp: r.read_f32()?,
            frame_number: r.read_u8()?,
            death_count: r.read_u8()?,
            percentage: r.read_u16()?,
            is_dead: r.read_bool()?,
            is_paused: r.read_bool()?,
            is_practicing: r.read_bool()?,
            is_in_editor: r.read_bool()?,
            is_editor_building: r.read_bool()?,
            is_last_death_real: r.read_bool()?,
            player1: r.read_option(PlayerObjectData::read)?,
            player2: r.read_option(PlayerObjectData::read)?,
        })
    }
}
