//! Player-State Sender (`spec.md` §2 item 8, §4.7, §4.12): gathers a
//! `PlayerData` from the `GameSurface` at the configured TPS and ships it
//! as an unreliable packet, guarded against naive and non-naive
//! speedhacks.

use std::time::{Duration, Instant};

use crate::data::{PlayerObjectData, PlayerState};
use crate::surface::GameSurface;

pub const MIN_TPS: u32 = 1;
pub const MAX_TPS: u32 = 240;
/// The non-naive guard's tolerance (`spec.md` §4.7): a send spaced less
/// than this fraction of the nominal interval apart is dropped outright.
const NON_NAIVE_TOLERANCE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    NotDue,
    /// Dropped by the non-naive guard: informative, not punitive
    /// (`spec.md` §4.12) — the sender keeps running, it just skips this one.
    DroppedSuspectedSpeedhack,
    Inactive,
}

pub struct PlayerStateSender {
    tps: u32,
    interval: Duration,
    last_send: Option<Instant>,
    frame_counter: u8,
    joined_level_id: Option<i32>,
    last_time_scale: f32,
}

impl PlayerStateSender {
    pub fn new(tps: u32) -> Self {
        let tps = tps.clamp(MIN_TPS, MAX_TPS);
        Self {
            tps,
            interval: Duration::from_secs_f64(1.0 / tps as f64),
            last_send: None,
            frame_counter: 0,
            joined_level_id: None,
            last_time_scale: 1.0,
        }
    }

    pub fn set_tps(&mut self, tps: u32) {
        self.tps = tps.clamp(MIN_TPS, MAX_TPS);
        self.interval = Duration::from_secs_f64(1.0 / self.tps as f64);
    }

    pub fn tps(&self) -> u32 {
        self.tps
    }

    /// Call when the client sends `LevelJoin`; the sender stays paused
    /// until this is set, and only runs while the surface reports the
    /// same level id back.
    pub fn on_level_join(&mut self, level_id: i32) {
        self.joined_level_id = Some(level_id);
        self.last_send = None;
    }

    pub fn on_level_leave(&mut self) {
        self.joined_level_id = None;
    }

    fn is_active(&self, established: bool, surface_level: Option<i32>) -> bool {
        established && self.joined_level_id.is_some() && surface_level == self.joined_level_id
    }

    /// Drives one pass of the ticker. Reads the engine's reported
    /// time-scale every tick (the naive guard, `spec.md` §4.7): when it
    /// has changed since the last tick, the ticker interval is re-derived
    /// — but always back to its canonical, TPS-anchored wall-clock value,
    /// never scaled by the reported value itself, so an engine that lies
    /// about its time-scale to inflate the send rate gains nothing from
    /// it. Separately, any call spaced too closely to the last real send
    /// is rejected outright (the non-naive guard).
    pub fn tick(
        &mut self,
        now: Instant,
        account_id: i32,
        established: bool,
        surface: &dyn GameSurface,
    ) -> (SendOutcome, Option<PlayerState>) {
        let surface_level = surface.is_in_level();
        if !self.is_active(established, surface_level) {
            return (SendOutcome::Inactive, None);
        }

        let time_scale = surface.time_scale();
        if time_scale != self.last_time_scale {
            self.last_time_scale = time_scale;
            self.interval = Duration::from_secs_f64(1.0 / self.tps as f64);
        }

        if let Some(last) = self.last_send {
            let elapsed = now.duration_since(last);
            if elapsed < self.interval.mul_f32(NON_NAIVE_TOLERANCE) {
                return (SendOutcome::DroppedSuspectedSpeedhack, None);
            }
            if elapsed < self.interval {
                return (SendOutcome::NotDue, None);
            }
        }

        self.last_send = Some(now);
        let state = self.gather_state(account_id, surface);
        (SendOutcome::Sent, Some(state))
    }

    fn gather_state(&mut self, account_id: i32, surface: &dyn GameSurface) -> PlayerState {
        self.frame_counter = self.frame_counter.wrapping_add(1);

        let t1 = surface.current_player1_transform();
        let player1 = PlayerObjectData {
            position: t1.position,
            rotation: t1.rotation,
            ..Default::default()
        };
        let player2 = surface.current_player2_transform().map(|t2| PlayerObjectData {
            position: t2.position,
            rotation: t2.rotation,
            ..Default::default()
        });

        PlayerState {
            account_id,
            timestamp: 0.0,
            frame_number: self.frame_counter,
            is_paused: surface.is_paused(),
            player1: Some(player1),
            player2,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::PlayerTransform;

    struct StubSurface {
        level: Option<i32>,
        time_scale: f32,
    }

    impl StubSurface {
        fn at_level(level: i32) -> Self {
            Self {
                level: Some(level),
                time_scale: 1.0,
            }
        }
    }

    impl GameSurface for StubSurface {
        fn current_player1_transform(&self) -> PlayerTransform {
            PlayerTransform {
                position: (1.0, 2.0),
                rotation: 0.0,
            }
        }
        fn current_player2_transform(&self) -> Option<PlayerTransform> {
            None
        }
        fn is_in_level(&self) -> Option<i32> {
            self.level
        }
        fn is_paused(&self) -> bool {
            false
        }
        fn time_scale(&self) -> f32 {
            self.time_scale
        }
        fn spawn_avatar(&mut self, _account_id: i32) {}
        fn despawn_avatar(&mut self, _account_id: i32) {}
        fn set_avatar_state(&mut self, _account_id: i32, _state: crate::surface::VisualPlayerState) {}
        fn play_death_effect(&mut self, _account_id: i32) {}
        fn play_jump_effect(&mut self, _account_id: i32, _which: crate::surface::PlayerSlot) {}
        fn show_toast(&mut self, _text: &str, _icon: u8, _seconds: f32) {}
    }

    #[test]
    fn inactive_until_level_joined() {
        let mut sender = PlayerStateSender::new(30);
        let surface = StubSurface::at_level(5);
        let (outcome, _) = sender.tick(Instant::now(), 1, true, &surface);
        assert_eq!(outcome, SendOutcome::Inactive);
    }

    #[test]
    fn pauses_when_surface_level_mismatches_joined_level() {
        let mut sender = PlayerStateSender::new(30);
        sender.on_level_join(5);
        let surface = StubSurface::at_level(6);
        let (outcome, _) = sender.tick(Instant::now(), 1, true, &surface);
        assert_eq!(outcome, SendOutcome::Inactive);
    }

    #[test]
    fn sender_cap_stays_within_tps_band_over_one_second() {
        let mut sender = PlayerStateSender::new(30);
        sender.on_level_join(5);
        let surface = StubSurface::at_level(5);
        let start = Instant::now();
        let mut sent = 0;
        let mut t = start;
        // drive at a much higher real tick rate than TPS for one second
        for _ in 0..1000 {
            t += Duration::from_millis(1);
            let (outcome, _) = sender.tick(t, 1, true, &surface);
            if outcome == SendOutcome::Sent {
                sent += 1;
            }
        }
        assert!((28..=32).contains(&sent), "sent {sent} packets in one second at TPS=30");
    }

    #[test]
    fn rapid_resend_is_dropped_not_disconnected() {
        let mut sender = PlayerStateSender::new(30);
        sender.on_level_join(5);
        let surface = StubSurface::at_level(5);
        let t0 = Instant::now();
        let (first, _) = sender.tick(t0, 1, true, &surface);
        assert_eq!(first, SendOutcome::Sent);
        let (second, _) = sender.tick(t0 + Duration::from_millis(1), 1, true, &surface);
        assert_eq!(second, SendOutcome::DroppedSuspectedSpeedhack);
    }

    #[test]
    fn level_leave_pauses_the_ticker() {
        let mut sender = PlayerStateSender::new(30);
        sender.on_level_join(5);
        sender.on_level_leave();
        let surface = StubSurface::at_level(5);
        let (outcome, _) = sender.tick(Instant::now(), 1, true, &surface);
        assert_eq!(outcome, SendOutcome::Inactive);
    }

    #[test]
    fn a_lying_time_scale_does_not_inflate_the_send_rate() {
        let mut sender = PlayerStateSender::new(30);
        sender.on_level_join(5);
        let mut surface = StubSurface::at_level(5);
        surface.time_scale = 100.0;
        let start = Instant::now();
        let mut sent = 0;
        let mut t = start;
        // 100 ticks driven at the reported 100x rate; even though the
        // interval is re-derived on every time-scale change, it is always
        // re-derived back to the canonical 1/TPS value, so pacing still
        // follows real wall-clock time.
        for _ in 0..100 {
            t += Duration::from_millis(1);
            let (outcome, _) = sender.tick(t, 1, true, &surface);
            if outcome == SendOutcome::Sent {
                sent += 1;
            }
        }
        assert!(sent <= 2, "sent {sent} packets under a forced 100x time-scale");
    }
}
