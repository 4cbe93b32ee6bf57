//! A headless [`GameSurface`] implementation for the harness binary. There
//! is no real game engine here: local transforms are whatever the TUI's
//! "walk" keys last set, and avatar hooks just log.

use globed_core::surface::{GameSurface, PlayerSlot, PlayerTransform, VisualPlayerState};

pub struct HarnessSurface {
    pub p1: PlayerTransform,
    pub p2: Option<PlayerTransform>,
    pub level_id: Option<i32>,
    pub paused: bool,
    pub time_scale: f32,
    pub remote_count: usize,
    pub last_toast: Option<String>,
}

impl Default for HarnessSurface {
    fn default() -> Self {
        Self {
            p1: PlayerTransform {
                position: (0.0, 0.0),
                rotation: 0.0,
            },
            p2: None,
            level_id: None,
            paused: false,
            time_scale: 1.0,
            remote_count: 0,
            last_toast: None,
        }
    }
}

impl GameSurface for HarnessSurface {
    fn current_player1_transform(&self) -> PlayerTransform {
        self.p1
    }

    fn current_player2_transform(&self) -> Option<PlayerTransform> {
        self.p2
    }

    fn is_in_level(&self) -> Option<i32> {
        self.level_id
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn time_scale(&self) -> f32 {
        self.time_scale
    }

    fn spawn_avatar(&mut self, account_id: i32) {
        self.remote_count += 1;
        log::info!("spawned avatar for {account_id}");
    }

    fn despawn_avatar(&mut self, account_id: i32) {
        self.remote_count = self.remote_count.saturating_sub(1);
        log::info!("despawned avatar for {account_id}");
    }

    fn set_avatar_state(&mut self, _account_id: i32, _state: VisualPlayerState) {}

    fn play_death_effect(&mut self, account_id: i32) {
        log::debug!("death effect for {account_id}");
    }

    fn play_jump_effect(&mut self, account_id: i32, which: PlayerSlot) {
        log::debug!("jump effect for {account_id} ({which:?})");
    }

    fn show_toast(&mut self, text: &str, _icon: u8, _seconds: f32) {
        self.last_toast = Some(text.to_string());
    }
}
