//! Remote-Player Registry (`spec.md` §2 item 10, §4.9): tracks
//! `RemotePlayer` entities keyed by account id, owns the [`Interpolator`],
//! and derives one-shot events (death, jump, spider-teleport) by diffing
//! successive raw snapshots.

use std::collections::{HashMap, HashSet};

use crate::config::InterpolationMode;
use crate::data::{PlayerIconType, PlayerState};
use crate::interpolator::{Frame, Interpolator};
use crate::surface::PlayerSlot;

/// A snapshot big enough to be a spider re-spawn/teleport rather than
/// continuous travel. Spiders otherwise move in small steps each tick.
const SPIDER_TELEPORT_DISTANCE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedEvent {
    Death,
    Jump(PlayerSlot),
    SpiderTeleport(PlayerSlot),
}

struct RemotePlayer {
    last_raw: PlayerState,
    progress: f32,
    is_practicing: bool,
}

/// Outcome of one `LevelData` delivery: who's new (and needs a profile
/// fetch), who left, and the events derived along the way.
#[derive(Debug, Default)]
pub struct LevelDataDiff {
    pub joined: Vec<i32>,
    pub left: Vec<i32>,
    pub events: Vec<(i32, DerivedEvent)>,
}

pub struct RemotePlayerRegistry {
    players: HashMap<i32, RemotePlayer>,
    interpolator: Interpolator,
    pub hide_practicing: bool,
    force_visible: HashSet<i32>,
    force_hidden: HashSet<i32>,
}

impl RemotePlayerRegistry {
    pub fn new(mode: InterpolationMode) -> Self {
        Self {
            players: HashMap::new(),
            interpolator: Interpolator::new(mode),
            hide_practicing: false,
            force_visible: HashSet::new(),
            force_hidden: HashSet::new(),
        }
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.interpolator.set_mode(mode);
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &i32> {
        self.players.keys()
    }

    pub fn is_tracked(&self, account_id: i32) -> bool {
        self.players.contains_key(&account_id)
    }

    pub fn force_visible(&mut self, account_id: i32) {
        self.force_hidden.remove(&account_id);
        self.force_visible.insert(account_id);
    }

    pub fn force_hidden(&mut self, account_id: i32) {
        self.force_visible.remove(&account_id);
        self.force_hidden.insert(account_id);
    }

    pub fn clear_force_override(&mut self, account_id: i32) {
        self.force_visible.remove(&account_id);
        self.force_hidden.remove(&account_id);
    }

    /// Applies one `LevelData` delivery (`spec.md` §4.9): creates newly
    /// observed players, destroys departed ones, feeds survivors into the
    /// interpolator, and derives death/jump/teleport events by diffing
    /// each player's new raw snapshot against its last one.
    pub fn apply_level_data(&mut self, incoming: &[(i32, PlayerState)], expected_delta: f32) -> LevelDataDiff {
        let mut diff = LevelDataDiff::default();
        let incoming_ids: HashSet<i32> = incoming.iter().map(|(id, _)| *id).collect();

        let departed: Vec<i32> = self
            .players
            .keys()
            .filter(|id| !incoming_ids.contains(id))
            .copied()
            .collect();
        for id in departed {
            self.players.remove(&id);
            self.interpolator.remove(id);
            diff.left.push(id);
        }

        for (account_id, state) in incoming {
            let account_id = *account_id;
            let frame = Frame {
                timestamp: state.timestamp,
                player1: state.player1.unwrap_or_default(),
                player2: state.player2,
            };

            match self.players.get_mut(&account_id) {
                None => {
                    self.players.insert(
                        account_id,
                        RemotePlayer {
                            last_raw: *state,
                            progress: state.progress(),
                            is_practicing: state.is_practicing,
                        },
                    );
                    diff.joined.push(account_id);
                }
                Some(player) => {
                    diff.events.extend(derive_events(account_id, &player.last_raw, state));
                    player.last_raw = *state;
                    player.progress = state.progress();
                    player.is_practicing = state.is_practicing;
                }
            }

            self.interpolator.ingest(account_id, frame, expected_delta);
        }

        diff
    }

    /// Advances every tracked player's interpolator by `dt`, returning
    /// `(account_id, Frame)` pairs ready to apply to an avatar.
    pub fn tick(&mut self, dt: f32) -> Vec<(i32, Frame)> {
        let ids: Vec<i32> = self.players.keys().copied().collect();
        ids.into_iter()
            .filter_map(|id| self.interpolator.tick(id, dt).map(|frame| (id, frame)))
            .collect()
    }

    pub fn progress_of(&self, account_id: i32) -> Option<f32> {
        self.players.get(&account_id).map(|p| p.progress)
    }

    /// Computes this player's opacity under the hide-practicing,
    /// hide-nearby, and force-visibility/force-hide policies
    /// (`spec.md` §4.9).
    pub fn opacity_of(&self, account_id: i32, local_p1: (f32, f32), local_p2: Option<(f32, f32)>) -> f32 {
        if self.force_hidden.contains(&account_id) {
            return 0.0;
        }
        if self.force_visible.contains(&account_id) {
            return 1.0;
        }
        let Some(player) = self.players.get(&account_id) else {
            return 1.0;
        };
        if self.hide_practicing && player.is_practicing {
            return 0.0;
        }

        let distance_to = |a: (f32, f32), b: (f32, f32)| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
        let pos = player.last_raw.player1.map(|p| p.position).unwrap_or((0.0, 0.0));
        let mut min_distance = distance_to(pos, local_p1);
        if let Some(p2) = local_p2 {
            min_distance = min_distance.min(distance_to(pos, p2));
        }

        (min_distance / 150.0).clamp(0.0, 1.0)
    }
}

fn derive_events(account_id: i32, prev: &PlayerState, current: &PlayerState) -> Vec<(i32, DerivedEvent)> {
    let mut events = Vec::new();

    if !prev.is_dead && current.is_dead {
        events.push((account_id, DerivedEvent::Death));
    }

    for (slot, prev_obj, cur_obj) in [
        (PlayerSlot::P1, prev.player1, current.player1),
        (PlayerSlot::P2, prev.player2, current.player2),
    ] {
        let (Some(prev_obj), Some(cur_obj)) = (prev_obj, cur_obj) else {
            continue;
        };

        if prev_obj.is_grounded && !cur_obj.is_grounded {
            events.push((account_id, DerivedEvent::Jump(slot)));
        }

        if prev_obj.icon_type == PlayerIconType::Spider && cur_obj.icon_type == PlayerIconType::Spider {
            let dx = cur_obj.position.0 - prev_obj.position.0;
            let dy = cur_obj.position.1 - prev_obj.position.1;
            if (dx * dx + dy * dy).sqrt() > SPIDER_TELEPORT_DISTANCE {
                events.push((account_id, DerivedEvent::SpiderTeleport(slot)));
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PlayerObjectData;

    fn state(account_id: i32, timestamp: f32, is_dead: bool, grounded: bool) -> PlayerState {
        PlayerState {
            account_id,
            timestamp,
            is_dead,
            player1: Some(PlayerObjectData {
                is_grounded: grounded,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn registry_parity_after_level_data() {
        let mut registry = RemotePlayerRegistry::new(InterpolationMode::Lerp);
        let diff = registry.apply_level_data(&[(1, state(1, 0.0, false, true)), (2, state(2, 0.0, false, true))], 0.033);
        assert_eq!(diff.joined, vec![1, 2]);

        let diff2 = registry.apply_level_data(&[(1, state(1, 0.033, false, true))], 0.033);
        assert!(diff2.left.contains(&2));
        assert_eq!(registry.player_ids().collect::<Vec<_>>(), vec![&1]);
    }

    #[test]
    fn death_transition_is_derived() {
        let mut registry = RemotePlayerRegistry::new(InterpolationMode::Lerp);
        registry.apply_level_data(&[(1, state(1, 0.0, false, true))], 0.033);
        let diff = registry.apply_level_data(&[(1, state(1, 0.033, true, true))], 0.033);
        assert_eq!(diff.events, vec![(1, DerivedEvent::Death)]);
    }

    #[test]
    fn leaving_ground_is_a_jump() {
        let mut registry = RemotePlayerRegistry::new(InterpolationMode::Lerp);
        registry.apply_level_data(&[(1, state(1, 0.0, false, true))], 0.033);
        let diff = registry.apply_level_data(&[(1, state(1, 0.033, false, false))], 0.033);
        assert_eq!(diff.events, vec![(1, DerivedEvent::Jump(PlayerSlot::P1))]);
    }

    #[test]
    fn hide_practicing_zeroes_opacity() {
        let mut registry = RemotePlayerRegistry::new(InterpolationMode::Lerp);
        registry.hide_practicing = true;
        let mut practicing_state = state(1, 0.0, false, true);
        practicing_state.is_practicing = true;
        registry.apply_level_data(&[(1, practicing_state)], 0.033);
        assert_eq!(registry.opacity_of(1, (0.0, 0.0), None), 0.0);
    }

    #[test]
    fn force_hidden_overrides_everything() {
        let mut registry = RemotePlayerRegistry::new(InterpolationMode::Lerp);
        registry.apply_level_data(&[(1, state(1, 0.0, false, true))], 0.033);
        registry.force_hidden(1);
        assert_eq!(registry.opacity_of(1, (1000.0, 1000.0), None), 0.0);
    }

    #[test]
    fn hide_nearby_scales_with_distance() {
        let mut registry = RemotePlayerRegistry::new(InterpolationMode::Lerp);
        registry.apply_level_data(&[(1, state(1, 0.0, false, true))], 0.033);
        assert_eq!(registry.opacity_of(1, (0.0, 0.0), None), 0.0);
        assert_eq!(registry.opacity_of(1, (150.0, 0.0), None), 1.0);
        assert_eq!(registry.opacity_of(1, (75.0, 0.0), None), 0.5);
    }
}
