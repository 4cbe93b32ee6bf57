//! The `GameSurface` port (`spec.md` §1, §6): the boundary between this
//! crate's replication engine and the host game engine. The core only
//! ever talks to a game through this trait; it never holds a scene-graph
//! reference back (`SPEC_FULL.md` §9 "re-architect as message passing").

use crate::data::PlayerObjectData;

/// A snapshot of one (possibly two-player) local transform, as read from
/// the host engine once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerTransform {
    pub position: (f32, f32),
    pub rotation: f32,
}

/// Which sub-player a jump-effect or spider-teleport event applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSlot {
    P1,
    P2,
}

/// The interpolated, visually-ready state for one remote player, handed
/// to the engine each tick by the Remote-Player Registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualPlayerState {
    pub player1: PlayerObjectData,
    pub player2: Option<PlayerObjectData>,
    pub opacity: f32,
}

/// The host-engine boundary this crate consumes. Implemented once by
/// whatever embeds `globed-core` (a real game mod, or the harness
/// binary's stub).
pub trait GameSurface {
    fn current_player1_transform(&self) -> PlayerTransform;
    fn current_player2_transform(&self) -> Option<PlayerTransform>;
    /// `Some(level_id)` while a level is loaded and playable.
    fn is_in_level(&self) -> Option<i32>;
    fn is_paused(&self) -> bool;
    /// The engine's current time-scale multiplier (1.0 = normal speed);
    /// feeds the naive speedhack heuristic in the Player-State Sender.
    fn time_scale(&self) -> f32;

    fn spawn_avatar(&mut self, account_id: i32);
    fn despawn_avatar(&mut self, account_id: i32);
    fn set_avatar_state(&mut self, account_id: i32, state: VisualPlayerState);
    fn play_death_effect(&mut self, account_id: i32);
    fn play_jump_effect(&mut self, account_id: i32, which: PlayerSlot);
    fn show_toast(&mut self, text: &str, icon: u8, seconds: f32);
}
