//! Room & Event Control Plane (`spec.md` §2 item 12, §4.11): applies
//! inbound room/team/invite messages to a single in-memory [`RoomState`]
//! and builds the variable-width trigger payloads used by
//! `FireServerObject`/`ListenEventObject`.

use std::collections::HashSet;

use crate::config::InvitesFrom;
use crate::data::event::{decode_event_args, encode_event_args, EventArg};
use crate::data::{RoomSettings, RoomState, RoomTeam};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvite {
    pub from_account_id: i32,
    pub room_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    Joined,
    JoinFailed(String),
    CreateFailed(String),
    Left,
    SettingsUpdated,
    TeamChanged(i32, u8),
    InviteReceived(PendingInvite),
    InviteRejected(i32),
}

/// Owns the single active room and the local invite policy
/// (`spec.md` §4.11). A fresh registry starts in the global room
/// (`room_id == 0`).
#[derive(Default)]
pub struct RoomControlPlane {
    room: RoomState,
    invites_from: InvitesFrom,
    blocked: HashSet<i32>,
    friends: HashSet<i32>,
}

impl RoomControlPlane {
    pub fn new(invites_from: InvitesFrom) -> Self {
        Self {
            room: RoomState::default(),
            invites_from,
            blocked: HashSet::new(),
            friends: HashSet::new(),
        }
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    pub fn set_invites_from(&mut self, policy: InvitesFrom) {
        self.invites_from = policy;
    }

    pub fn block_user(&mut self, account_id: i32) {
        self.blocked.insert(account_id);
    }

    pub fn unblock_user(&mut self, account_id: i32) {
        self.blocked.remove(&account_id);
    }

    pub fn set_friend(&mut self, account_id: i32, is_friend: bool) {
        if is_friend {
            self.friends.insert(account_id);
        } else {
            self.friends.remove(&account_id);
        }
    }

    /// Applies a full room snapshot pushed by the server (`RoomStatePacket`).
    pub fn apply_room_state(&mut self, room: RoomState) -> RoomEvent {
        self.room = room;
        RoomEvent::Joined
    }

    pub fn apply_join_failed(&mut self, reason: String) -> RoomEvent {
        RoomEvent::JoinFailed(reason)
    }

    pub fn apply_create_failed(&mut self, reason: String) -> RoomEvent {
        RoomEvent::CreateFailed(reason)
    }

    /// Resets to the global room. Servers confirm `RoomLeave` with a fresh
    /// `RoomStatePacket` for room 0, but the client side can optimistically
    /// clear its local view the moment it sends the request.
    pub fn reset_to_global(&mut self) -> RoomEvent {
        self.room = RoomState::default();
        RoomEvent::Left
    }

    pub fn apply_settings_update(&mut self, settings: RoomSettings) -> RoomEvent {
        self.room.settings = settings;
        RoomEvent::SettingsUpdated
    }

    pub fn apply_team_change(&mut self, account_id: i32, team_id: u8) -> RoomEvent {
        self.room.set_team(account_id, team_id);
        RoomEvent::TeamChanged(account_id, team_id)
    }

    pub fn teams(&self) -> &[RoomTeam] {
        &self.room.teams
    }

    /// Filters an inbound `RoomInviteReceived` by the local invite policy
    /// and blocklist (`spec.md` §4.11). Blocked senders and a policy of
    /// `Nobody` silently reject; `Friends` requires the sender to be known.
    pub fn filter_invite(&self, from_account_id: i32, room_id: u32) -> RoomEvent {
        let accepted = !self.blocked.contains(&from_account_id)
            && match self.invites_from {
                InvitesFrom::Nobody => false,
                InvitesFrom::Friends => self.friends.contains(&from_account_id),
                InvitesFrom::Anyone => true,
            };

        if accepted {
            RoomEvent::InviteReceived(PendingInvite {
                from_account_id,
                room_id,
            })
        } else {
            RoomEvent::InviteRejected(from_account_id)
        }
    }

    /// Encodes the payload for an outbound `FireEvent`/`FireServerObject`
    /// trigger (`spec.md` §4.11, wire layout in `data::event`).
    pub fn encode_trigger(&self, args: &[EventArg]) -> Vec<u8> {
        encode_event_args(args)
    }

    /// Decodes the payload of an inbound `EventBroadcast` previously fired
    /// by a `ListenEventObject` subscription.
    pub fn decode_trigger(&self, payload: &[u8]) -> Option<Vec<EventArg>> {
        decode_event_args(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SessionId;

    #[test]
    fn fresh_plane_starts_in_the_global_room() {
        let plane = RoomControlPlane::new(InvitesFrom::Friends);
        assert!(plane.room().is_global());
    }

    #[test]
    fn joining_a_room_replaces_local_state() {
        let mut plane = RoomControlPlane::new(InvitesFrom::Friends);
        let room = RoomState {
            room_id: 9,
            room_owner: 1,
            room_name: "cool room".into(),
            pinned_level: SessionId::from_parts(1, 1, 1),
            ..Default::default()
        };
        assert_eq!(plane.apply_room_state(room.clone()), RoomEvent::Joined);
        assert_eq!(plane.room().room_id, 9);
    }

    #[test]
    fn leaving_resets_to_global() {
        let mut plane = RoomControlPlane::new(InvitesFrom::Friends);
        plane.apply_room_state(RoomState {
            room_id: 9,
            ..Default::default()
        });
        plane.reset_to_global();
        assert!(plane.room().is_global());
    }

    #[test]
    fn invite_policy_nobody_rejects_everyone() {
        let plane = RoomControlPlane::new(InvitesFrom::Nobody);
        assert_eq!(plane.filter_invite(5, 9), RoomEvent::InviteRejected(5));
    }

    #[test]
    fn invite_policy_friends_requires_known_sender() {
        let mut plane = RoomControlPlane::new(InvitesFrom::Friends);
        assert_eq!(plane.filter_invite(5, 9), RoomEvent::InviteRejected(5));
        plane.set_friend(5, true);
        assert_eq!(
            plane.filter_invite(5, 9),
            RoomEvent::InviteReceived(PendingInvite {
                from_account_id: 5,
                room_id: 9
            })
        );
    }

    #[test]
    fn blocked_sender_is_rejected_even_under_anyone_policy() {
        let mut plane = RoomControlPlane::new(InvitesFrom::Anyone);
        plane.block_user(5);
        assert_eq!(plane.filter_invite(5, 9), RoomEvent::InviteRejected(5));
    }

    #[test]
    fn trigger_args_roundtrip_through_the_control_plane() {
        let plane = RoomControlPlane::new(InvitesFrom::Anyone);
        let args = vec![EventArg::Bool(true), EventArg::Int(-7), EventArg::Group(3)];
        let encoded = plane.encode_trigger(&args);
        assert_eq!(plane.decode_trigger(&encoded), Some(args));
    }
}
