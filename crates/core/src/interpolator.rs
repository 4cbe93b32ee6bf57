//! Interpolator (`spec.md` §2 item 9, §4.8): reconstructs a smooth visual
//! `PlayerState` each tick from the sparse `PlayerState` snapshots that
//! arrive over the network at roughly server-TPS. Owned by the
//! Remote-Player Registry, one [`PlayerInterpolator`] per tracked account.

use std::collections::HashMap;

use crate::config::InterpolationMode;
use crate::data::PlayerObjectData;

/// `(0.2 * expectedDelta)` tolerance for treating a new snapshot as a
/// late refinement of the current `newer` rather than the next segment.
const NEAR_DUPLICATE_FRACTION: f32 = 0.2;

/// One server-produced snapshot with its network timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub timestamp: f32,
    pub player1: PlayerObjectData,
    pub player2: Option<PlayerObjectData>,
}

fn lerp_object(a: &PlayerObjectData, b: &PlayerObjectData, t: f32) -> PlayerObjectData {
    let lerp = |x: f32, y: f32| x + (y - x) * t;
    let mut out = *b;
    out.position = (lerp(a.position.0, b.position.0), lerp(a.position.1, b.position.1));
    out.rotation = lerp(a.rotation, b.rotation);
    out
}

fn lerp_frame(a: &Frame, b: &Frame, t: f32) -> Frame {
    Frame {
        timestamp: a.timestamp + (b.timestamp - a.timestamp) * t,
        player1: lerp_object(&a.player1, &b.player1, t),
        player2: match (&a.player2, &b.player2) {
            (Some(ap), Some(bp)) => Some(lerp_object(ap, bp, t)),
            _ => b.player2,
        },
    }
}

/// Per-player keyframe buffer driving one of two visual output modes.
pub struct PlayerInterpolator {
    mode: InterpolationMode,
    older: Option<Frame>,
    newer: Option<Frame>,
    time_counter: f32,
    last_output: Option<Frame>,
}

impl PlayerInterpolator {
    pub fn new(mode: InterpolationMode) -> Self {
        Self {
            mode,
            older: None,
            newer: None,
            time_counter: 0.0,
            last_output: None,
        }
    }

    pub fn set_mode(&mut self, mode: InterpolationMode) {
        self.mode = mode;
    }

    /// Feeds in a newly arrived snapshot, applying the duplicate /
    /// near-duplicate / advance rules from `spec.md` §4.8.
    pub fn push_snapshot(&mut self, frame: Frame, expected_delta: f32) {
        let Some(cur_newer) = self.newer else {
            self.newer = Some(frame);
            self.time_counter = frame.timestamp;
            return;
        };

        if frame.timestamp == cur_newer.timestamp {
            self.extrapolate_on_duplicate(cur_newer);
        } else if (frame.timestamp - cur_newer.timestamp).abs() < NEAR_DUPLICATE_FRACTION * expected_delta {
            self.newer = Some(frame);
        } else {
            self.older = Some(cur_newer);
            self.newer = Some(frame);
            self.time_counter = cur_newer.timestamp;
        }
    }

    /// A snapshot with the same timestamp as the current `newer` hides a
    /// short server stall: fabricate a frame one interval further out by
    /// extending the `older -> newer` segment to `t=2.0`.
    fn extrapolate_on_duplicate(&mut self, cur_newer: Frame) {
        let Some(older) = self.older else {
            // nothing to extrapolate from yet; just keep waiting.
            return;
        };
        let synthetic = lerp_frame(&older, &cur_newer, 2.0);
        self.older = Some(cur_newer);
        self.newer = Some(synthetic);
    }

    /// Advances the visual output by `dt` and returns the frame to apply
    /// to the avatar this tick.
    pub fn tick(&mut self, dt: f32) -> Option<Frame> {
        let output = match self.mode {
            InterpolationMode::Realtime => self.newer.or(self.last_output),
            InterpolationMode::Lerp => self.tick_lerp(dt),
        };
        if output.is_some() {
            self.last_output = output;
        }
        self.last_output
    }

    fn tick_lerp(&mut self, dt: f32) -> Option<Frame> {
        let (Some(older), Some(newer)) = (self.older, self.newer) else {
            return self.last_output;
        };

        let delta = newer.timestamp - older.timestamp;
        if delta <= 0.0 {
            return self.last_output;
        }

        self.time_counter += dt;
        let mut t = (self.time_counter - older.timestamp) / delta;
        if !t.is_finite() {
            t = 0.0;
        }
        let t = t.clamp(0.0, 1.0);

        Some(lerp_frame(&older, &newer, t))
    }

    /// `true` when this player's latest snapshot is as fresh as the
    /// session's own last known server tick.
    pub fn is_fresh(&self, last_known_server_ts: f32) -> bool {
        self.newer.map(|f| f.timestamp == last_known_server_ts).unwrap_or(false)
    }
}

/// Owns one [`PlayerInterpolator`] per tracked account id.
#[derive(Default)]
pub struct Interpolator {
    mode: InterpolationMode,
    players: HashMap<i32, PlayerInterpolator>,
}

impl Interpolator {
    pub fn new(mode: InterpolationMode) -> Self {
        Self {
            mode,
            players: HashMap::new(),
        }
    }

    pub fn set_mode(&mut self, mode: InterpolationMode) {
        self.mode = mode;
        for player in self.players.values_mut() {
            player.set_mode(mode);
        }
    }

    pub fn ingest(&mut self, account_id: i32, frame: Frame, expected_delta: f32) {
        self.players
            .entry(account_id)
            .or_insert_with(|| PlayerInterpolator::new(self.mode))
            .push_snapshot(frame, expected_delta);
    }

    pub fn tick(&mut self, account_id: i32, dt: f32) -> Option<Frame> {
        self.players.get_mut(&account_id).and_then(|p| p.tick(dt))
    }

    pub fn is_fresh(&self, account_id: i32, last_known_server_ts: f32) -> bool {
        self.players
            .get(&account_id)
            .map(|p| p.is_fresh(last_known_server_ts))
            .unwrap_or(false)
    }

    pub fn remove(&mut self, account_id: i32) {
        self.players.remove(&account_id);
    }

    pub fn tracked_ids(&self) -> impl Iterator<Item = &i32> {
        self.players.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_at(t: f32, x: f32) -> Frame {
        Frame {
            timestamp: t,
            player1: PlayerObjectData {
                position: (x, 0.0),
                ..Default::default()
            },
            player2: None,
        }
    }

    #[test]
    fn lerp_continuity_across_two_ticks() {
        let mut interp = PlayerInterpolator::new(InterpolationMode::Lerp);
        interp.push_snapshot(frame_at(0.0, 0.0), 0.1);
        interp.push_snapshot(frame_at(0.1, 10.0), 0.1);

        let first = interp.tick(0.05).unwrap();
        assert!((first.player1.position.0 - 5.0).abs() < 1e-5);

        let second = interp.tick(0.05).unwrap();
        assert!((second.player1.position.0 - 10.0).abs() < 1e-5);
    }

    #[test]
    fn duplicate_snapshot_extrapolates_one_interval_further() {
        let mut interp = PlayerInterpolator::new(InterpolationMode::Lerp);
        interp.push_snapshot(frame_at(0.0, 0.0), 0.1);
        interp.push_snapshot(frame_at(0.1, 10.0), 0.1);
        interp.tick(0.05);
        interp.tick(0.05);

        interp.push_snapshot(frame_at(0.1, 10.0), 0.1);

        assert_eq!(interp.older.unwrap().timestamp, 0.1);
        assert!((interp.older.unwrap().player1.position.0 - 10.0).abs() < 1e-5);
        assert_eq!(interp.newer.unwrap().timestamp, 0.2);
        assert!((interp.newer.unwrap().player1.position.0 - 20.0).abs() < 1e-5);
    }

    #[test]
    fn clamps_at_newer_with_no_unbounded_extrapolation() {
        let mut interp = PlayerInterpolator::new(InterpolationMode::Lerp);
        interp.push_snapshot(frame_at(0.0, 0.0), 0.1);
        interp.push_snapshot(frame_at(0.1, 10.0), 0.1);

        let output = interp.tick(10.0).unwrap();
        assert!((output.player1.position.0 - 10.0).abs() < 1e-5);
    }

    #[test]
    fn missing_frames_replays_last_output_without_panicking() {
        let mut interp = PlayerInterpolator::new(InterpolationMode::Lerp);
        assert!(interp.tick(0.05).is_none());
        interp.push_snapshot(frame_at(0.0, 1.0), 0.1);
        assert!(interp.tick(0.05).is_none());
    }

    #[test]
    fn realtime_mode_outputs_the_latest_snapshot_directly() {
        let mut interp = PlayerInterpolator::new(InterpolationMode::Realtime);
        interp.push_snapshot(frame_at(0.0, 5.0), 0.1);
        let output = interp.tick(0.05).unwrap();
        assert_eq!(output.player1.position.0, 5.0);
    }

    #[test]
    fn near_duplicate_refines_newer_in_place() {
        let mut interp = PlayerInterpolator::new(InterpolationMode::Lerp);
        interp.push_snapshot(frame_at(0.0, 0.0), 0.1);
        interp.push_snapshot(frame_at(0.1, 10.0), 0.1);
        // within 0.2 * 0.1 = 0.02 of 0.1
        interp.push_snapshot(frame_at(0.105, 11.0), 0.1);
        assert_eq!(interp.newer.unwrap().timestamp, 0.105);
        assert_eq!(interp.older.unwrap().timestamp, 0.0);
    }

    #[test]
    fn freshness_matches_last_known_server_timestamp() {
        let mut interp = Interpolator::new(InterpolationMode::Lerp);
        interp.ingest(1, frame_at(1.0, 0.0), 0.1);
        assert!(interp.is_fresh(1, 1.0));
        assert!(!interp.is_fresh(1, 2.0));
    }
}
