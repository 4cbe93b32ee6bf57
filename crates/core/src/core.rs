//! Integration glue (`SPEC_FULL.md` §2 item 15): the top-level `Core` wires
//! every subsystem together as a single owned value. There are no
//! singletons or global state; an embedder constructs one `Core` per
//! active connection and drives it from its own tick loop.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::auth::{AccountIdentity, AuthClient, AuthKey, ChallengeAnswer, MessagePort};
use crate::codec::open_frame;
use crate::config::{self, ClientSettings, SettingsStore};
use crate::crypto::{self, adler32};
use crate::data::{EventArg, GameServer, PlayerIconData};
use crate::directory::{CentralServer, ServerDirectory};
use crate::integrity::{self, FingerprintPort};
use crate::packets::{client, decode_any, AnyPacket};
use crate::registry::{DerivedEvent, RemotePlayerRegistry};
use crate::room::RoomControlPlane;
use crate::router::{prepare_outbound, Router};
use crate::sender::{PlayerStateSender, SendOutcome};
use crate::session::{KeepAliveAction, Session, SessionError};
use crate::surface::GameSurface;
use crate::telemetry::{CoreError, ErrorQueue, Severity};
use crate::transport::{resolve_and_connect, spawn_io_thread, InboundFrame, CONNECT_TIMEOUT};
use crate::voice::{OpusFrame, VoicePipeline};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
    #[error(transparent)]
    Frame(#[from] crate::codec::FrameError),
}

/// Owns every subsystem named in `SPEC_FULL.md` and drives them from one
/// per-tick entry point. No subsystem here reaches back into another
/// through a shared reference; `Core::tick` is the only place state crosses
/// a subsystem boundary.
pub struct Core {
    pub session: Session,
    pub router: Router,
    pub directory: ServerDirectory,
    pub registry: RemotePlayerRegistry,
    pub room: RoomControlPlane,
    pub voice: VoicePipeline,
    pub sender: PlayerStateSender,
    pub telemetry: ErrorQueue,
    settings_store: Box<dyn SettingsStore>,
    settings: ClientSettings,
    resolve_cache: crate::transport::ResolveCache,
    surface: Box<dyn GameSurface>,
    icons: PlayerIconData,
    identity: Option<AccountIdentity>,
    authkey: Option<AuthKey>,
    storage_key: [u8; 32],
    /// Wall-clock epoch anchor paired with the `Instant` it was captured at,
    /// so a later `Instant` can be turned back into a real timestamp for
    /// `Ping.client_time_ms` (an `Instant` alone carries no epoch meaning).
    epoch_anchor: (Instant, u64),
}

impl Core {
    pub fn new(
        surface: Box<dyn GameSurface>,
        mut settings_store: Box<dyn SettingsStore>,
        centrals: Vec<CentralServer>,
        fingerprint_port: &dyn FingerprintPort,
    ) -> Self {
        let settings = config::load_settings(settings_store.as_ref());
        let mut directory = ServerDirectory::new(centrals);
        directory.restore_from_store(settings_store.as_ref());
        if let Some(cached) = config::load_server_list_cache(settings_store.as_ref()) {
            let _ = directory.load_cached_game_servers(&cached);
        }

        let storage_key = integrity::local_storage_key(integrity::fingerprint(fingerprint_port));
        let authkey = config::load_sealed_authkey(settings_store.as_ref())
            .and_then(|b64| crypto::base64_decode(&b64).ok())
            .and_then(|sealed| crypto::SymmetricBox::new(storage_key).open(&sealed).ok())
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .map(AuthKey);

        Self {
            session: Session::new(),
            router: Router::new(),
            directory,
            registry: RemotePlayerRegistry::new(settings.interpolation),
            room: RoomControlPlane::new(settings.invites_from),
            voice: VoicePipeline::new(),
            sender: PlayerStateSender::new(settings.tps),
            telemetry: ErrorQueue::default(),
            settings_store,
            settings,
            resolve_cache: crate::transport::ResolveCache::new(),
            surface,
            icons: PlayerIconData::default(),
            identity: None,
            authkey,
            storage_key,
            epoch_anchor: (
                Instant::now(),
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0),
            ),
        }
    }

    /// Converts a tick's monotonic `now` into a millisecond epoch timestamp
    /// anchored at construction time.
    fn epoch_millis_at(&self, now: Instant) -> u64 {
        let (anchor_instant, anchor_millis) = self.epoch_anchor;
        anchor_millis.saturating_add(now.saturating_duration_since(anchor_instant).as_millis() as u64)
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: ClientSettings) {
        self.sender.set_tps(settings.tps);
        self.registry.set_interpolation_mode(settings.interpolation);
        self.registry.hide_practicing = settings.hide_practicing;
        self.room.set_invites_from(settings.invites_from);
        self.voice.set_deafened(settings.deafened);
        config::save_settings(self.settings_store.as_mut(), &settings);
        self.settings = settings;
    }

    pub fn set_icons(&mut self, icons: PlayerIconData) {
        self.icons = icons;
        if self.session.is_established() {
            self.send_reliable(&client::SyncPlayerMetadata { icons: self.icons });
        }
    }

    /// Runs the challenge/verify auth flow against the active central
    /// server, storing the resulting long-term authkey for subsequent
    /// `connect` calls (`spec.md` §4.6).
    pub fn authenticate(&mut self, identity: AccountIdentity, messenger: &mut dyn MessagePort) -> Result<(), CoreError> {
        let base_url = self
            .directory
            .active_central()
            .ok_or_else(|| CoreError::Auth(crate::auth::AuthError::ChallengeFailed("no active central server".into())))?
            .url
            .clone();
        let client = AuthClient::new(base_url);
        let keybox = crate::crypto::KeyBox::generate();
        let answer: ChallengeAnswer = client.challenge_new(&identity, &keybox)?;
        let authkey = client.verify(&identity, &answer, messenger)?;

        if let Ok(sealed) = crypto::SymmetricBox::new(self.storage_key).seal(&authkey.0) {
            config::save_sealed_authkey(self.settings_store.as_mut(), &crypto::base64_encode(&sealed));
        }

        self.authkey = Some(authkey);
        self.identity = Some(identity);
        Ok(())
    }

    /// True once either a fresh `authenticate()` call or a restored
    /// sealed authkey from a prior launch is available for `Login`'s
    /// TOTP (`spec.md` §4.3 secure mode).
    pub fn has_authkey(&self) -> bool {
        self.authkey.is_some()
    }

    /// Replaces the stored authkey with the one encoded in a `LoggedIn`'s
    /// `ExtendedUserData.new_token`, e.g. after a role change rotates it
    /// server-side (`spec.md` §3 `ExtendedUserData`). Same derivation and
    /// sealed storage as `authenticate()`.
    fn rotate_authkey(&mut self, new_token: &str) {
        let Ok(raw) = crypto::base64_decode(new_token) else {
            self.telemetry.push(Severity::Warn, "received an unparseable rotated authkey".into());
            return;
        };
        let authkey = AuthKey(crypto::domain_hash("storage", &raw));
        if let Ok(sealed) = crypto::SymmetricBox::new(self.storage_key).seal(&authkey.0) {
            config::save_sealed_authkey(self.settings_store.as_mut(), &crypto::base64_encode(&sealed));
        }
        self.authkey = Some(authkey);
    }

    /// Opens a connection to `server`: resolves and connects both
    /// channels, spawns the I/O thread, and sends the first handshake
    /// packet. Connection attempts run synchronously up to the 3s connect
    /// timeout (`SPEC_FULL.md` §5 "cancellation/timeouts").
    pub fn connect(&mut self, server: &GameServer) -> Result<(), ConnectError> {
        let address = self.directory.effective_address(server).to_string();
        self.session.begin_connect();
        self.session.enter_tcp_connecting();

        let transport = resolve_and_connect(&address, &mut self.resolve_cache, CONNECT_TIMEOUT)?;
        let io = spawn_io_thread(transport);
        self.session.enter_handshaking(io);

        let handshake = client::CryptoHandshakeStart {
            client_pubkey: self.session.crypto.keybox.public_key_bytes(),
        };
        let frame = prepare_outbound(&handshake, None)?;
        if let Some(io) = &self.session.io {
            io.send_reliable(frame);
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.session.io.is_some() {
            if let Ok(frame) = prepare_outbound(&client::ClientDisconnect, None) {
                if let Some(io) = &self.session.io {
                    io.send_reliable(frame);
                }
            }
        }
        self.session.disconnect();
    }

    /// Drives one pass of the main tick thread (`SPEC_FULL.md` §5
    /// scheduling model): drains inbound frames, advances keep-alive and
    /// reconnect, ticks the sender and the remote-player interpolators, and
    /// applies the results to the `GameSurface`.
    pub fn tick(&mut self, now: Instant) {
        self.drain_inbound();
        self.tick_keepalive(now);
        self.tick_reconnect();

        if let Some(account_id) = self.session.account_id {
            let established = self.session.is_established();
            let (outcome, state) = self.sender.tick(now, account_id, established, self.surface.as_ref());
            if outcome == SendOutcome::Sent {
                if let Some(state) = state {
                    self.send_unreliable(&client::PlayerData { state });
                }
            }
        }

        let dt = 1.0 / self.session.server_tps.max(1) as f32;
        let frames = self.registry.tick(dt);
        for (account_id, frame) in frames {
            let local_p1 = self.surface.current_player1_transform().position;
            let local_p2 = self.surface.current_player2_transform().map(|t| t.position);
            let opacity = self.registry.opacity_of(account_id, local_p1, local_p2);
            self.surface.set_avatar_state(
                account_id,
                crate::surface::VisualPlayerState {
                    player1: frame.player1,
                    player2: frame.player2,
                    opacity,
                },
            );
        }
    }

    fn drain_inbound(&mut self) {
        let Some(io) = &self.session.io else { return };
        for frame in io.try_recv_all() {
            match frame {
                InboundFrame::Reliable(bytes) => self.handle_inbound_bytes(&bytes),
                InboundFrame::Datagram(bytes) => self.handle_inbound_bytes(&bytes),
                InboundFrame::Closed(reason) => {
                    self.telemetry.push(Severity::Warn, format!("connection closed: {reason}"));
                    self.session.enter_reconnecting();
                }
            }
        }
    }

    fn handle_inbound_bytes(&mut self, bytes: &[u8]) {
        let key = self.session.crypto.shared.as_ref();
        let (id, body) = match open_frame(bytes, key) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.telemetry.push_error(&CoreError::from(e));
                return;
            }
        };

        let any = match decode_any(id, &body) {
            Ok(any) => any,
            Err(e) => {
                self.telemetry.push_error(&CoreError::from(e));
                return;
            }
        };

        if self.handle_session_lifecycle(&any) {
            return;
        }

        self.route_to_subsystems(&any);
        self.router.dispatch(id, &any);
    }

    /// Intercepts the handful of packets that drive the session state
    /// machine itself, before anything reaches the general router. Returns
    /// `true` if the packet was consumed here.
    fn handle_session_lifecycle(&mut self, any: &AnyPacket) -> bool {
        match any {
            AnyPacket::CryptoHandshakeResponse(resp) => {
                self.session.complete_handshake(resp.server_pubkey);
                match &self.authkey {
                    Some(authkey) => {
                        if let Ok(totp) = crypto::totp::generate(&authkey.0) {
                            self.send_reliable(&client::Login { totp });
                        }
                    }
                    None if resp.secure => {
                        self.telemetry.push(
                            Severity::Error,
                            "server requires secure mode but no fresh central-server token is available",
                        );
                        self.session.fail(&SessionError::SecureModeUnsupported);
                    }
                    None => {
                        // Insecure server, no authkey yet: proceed with an all-zero TOTP: the
                        // server treats account_id == -1 identities as trusted (spec.md §4.6).
                        if let Ok(totp) = crypto::totp::generate(&[0u8; 32]) {
                            self.send_reliable(&client::Login { totp });
                        }
                    }
                }
                true
            }
            AnyPacket::LoggedIn(packet) => {
                self.session.complete_login(packet.account_id, packet.server_tps);
                if let Some(extended) = &packet.extended {
                    self.rotate_authkey(&extended.new_token);
                }
                self.send_reliable(&client::SyncIcons { icons: self.icons });
                true
            }
            AnyPacket::LoginFailed(packet) => {
                self.telemetry.push(Severity::Error, format!("login failed: {}", packet.reason));
                self.session.fail(&SessionError::LoginFailed(packet.reason.clone()));
                true
            }
            AnyPacket::Banned(packet) => {
                self.telemetry.push(Severity::Error, format!("banned: {}", packet.reason));
                self.session.fail(&SessionError::Banned(packet.reason.clone()));
                true
            }
            AnyPacket::Muted(packet) => {
                self.telemetry.push(Severity::Warn, format!("muted: {}", packet.reason));
                false
            }
            AnyPacket::ServerDisconnect(packet) => {
                self.telemetry.push(Severity::Debug, format!("server disconnect: {}", packet.reason));
                self.session.disconnect();
                true
            }
            AnyPacket::PingResponse(_) => {
                self.session.record_pong(Instant::now());
                true
            }
            _ => false,
        }
    }

    /// Feeds every non-lifecycle packet that a specific subsystem cares
    /// about (level data, rooms, voice) before the general router also
    /// sees it.
    fn route_to_subsystems(&mut self, any: &AnyPacket) {
        match any {
            AnyPacket::LevelData(packet) => {
                let expected_delta = 1.0 / self.session.server_tps.max(1) as f32;
                let diff = self.registry.apply_level_data(&packet.players, expected_delta);
                for account_id in &diff.joined {
                    self.surface.spawn_avatar(*account_id);
                }
                for account_id in &diff.left {
                    self.surface.despawn_avatar(*account_id);
                }
                for (account_id, event) in diff.events {
                    match event {
                        DerivedEvent::Death => self.surface.play_death_effect(account_id),
                        DerivedEvent::Jump(slot) | DerivedEvent::SpiderTeleport(slot) => {
                            self.surface.play_jump_effect(account_id, slot)
                        }
                    }
                }
            }
            AnyPacket::VoiceBroadcast(packet) => {
                self.voice.ingest(packet.sender, OpusFrame(packet.frame.clone()));
            }
            AnyPacket::RoomState(packet) => {
                self.room.apply_room_state(packet.room.clone());
            }
            AnyPacket::RoomJoinFailed(packet) => {
                self.telemetry.push(Severity::Warn, format!("failed to join room: {}", packet.reason));
                self.room.apply_join_failed(packet.reason.clone());
            }
            AnyPacket::RoomCreateFailed(packet) => {
                self.telemetry.push(Severity::Warn, format!("failed to create room: {}", packet.reason));
                self.room.apply_create_failed(packet.reason.clone());
            }
            AnyPacket::RoomInviteReceived(packet) => {
                self.room.filter_invite(packet.from_account_id, packet.room_id);
            }
            AnyPacket::ServerNotice(packet) => {
                self.surface.show_toast(&packet.text, packet.icon, packet.seconds);
            }
            _ => {}
        }
    }

    fn tick_keepalive(&mut self, now: Instant) {
        match self.session.tick_keepalive(now) {
            KeepAliveAction::SendPing => {
                let client_time_ms = self.epoch_millis_at(now);
                self.send_reliable(&client::Ping { client_time_ms });
            }
            KeepAliveAction::Dead => {
                self.telemetry.push(Severity::Warn, "keep-alive timed out");
                self.session.enter_reconnecting();
            }
            KeepAliveAction::None => {}
        }
    }

    fn tick_reconnect(&mut self) {
        if !self.session.ready_to_retry() {
            return;
        }
        let Some(server) = self.directory.game_servers().first().cloned() else {
            return;
        };
        if let Err(e) = self.connect(&server) {
            self.telemetry.push(Severity::Warn, format!("reconnect failed: {e}"));
            let jitter = adler32(server.id.as_bytes()) as f32 / u32::MAX as f32;
            self.session.backoff_record_failure(jitter);
        }
    }

    fn send_reliable<P: crate::codec::Packet>(&mut self, packet: &P) {
        match prepare_outbound(packet, self.session.crypto.shared.as_ref()) {
            Ok(frame) => {
                if let Some(io) = &self.session.io {
                    io.send_reliable(frame);
                }
            }
            Err(e) => self.telemetry.push_error(&CoreError::from(e)),
        }
    }

    fn send_unreliable<P: crate::codec::Packet>(&mut self, packet: &P) {
        match prepare_outbound(packet, self.session.crypto.shared.as_ref()) {
            Ok(frame) => {
                if let Some(io) = &self.session.io {
                    io.send_datagram(frame);
                }
            }
            Err(e) => self.telemetry.push_error(&CoreError::from(e)),
        }
    }

    pub fn join_level(&mut self, level_id: i32) {
        self.sender.on_level_join(level_id);
        self.send_reliable(&client::LevelJoin { level_id });
    }

    pub fn leave_level(&mut self) {
        self.sender.on_level_leave();
        self.send_reliable(&client::LevelLeave);
    }

    pub fn fire_event(&mut self, event_type: u16, args: &[EventArg]) {
        let args = self.room.encode_trigger(args);
        self.send_reliable(&client::FireEvent { event_type, args });
    }

    pub fn listen_event(&mut self, event_type: u16, group_id: u16) {
        self.send_reliable(&client::ListenEvent { event_type, group_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use crate::surface::{PlayerSlot, PlayerTransform, VisualPlayerState};

    struct StubSurface;

    impl GameSurface for StubSurface {
        fn current_player1_transform(&self) -> PlayerTransform {
            PlayerTransform {
                position: (0.0, 0.0),
                rotation: 0.0,
            }
        }
        fn current_player2_transform(&self) -> Option<PlayerTransform> {
            None
        }
        fn is_in_level(&self) -> Option<i32> {
            None
        }
        fn is_paused(&self) -> bool {
            false
        }
        fn time_scale(&self) -> f32 {
            1.0
        }
        fn spawn_avatar(&mut self, _account_id: i32) {}
        fn despawn_avatar(&mut self, _account_id: i32) {}
        fn set_avatar_state(&mut self, _account_id: i32, _state: VisualPlayerState) {}
        fn play_death_effect(&mut self, _account_id: i32) {}
        fn play_jump_effect(&mut self, _account_id: i32, _which: PlayerSlot) {}
        fn show_toast(&mut self, _text: &str, _icon: u8, _seconds: f32) {}
    }

    struct StubFingerprint;
    impl crate::integrity::FingerprintPort for StubFingerprint {
        fn compute(&self) -> Option<[u8; 32]> {
            Some([9u8; 32])
        }
    }

    fn new_core() -> Core {
        Core::new(
            Box::new(StubSurface),
            Box::new(MemoryStore::default()),
            vec![CentralServer {
                name: "main".into(),
                url: "https://central.example.com".into(),
            }],
            &StubFingerprint,
        )
    }

    #[test]
    fn fresh_core_starts_disconnected_with_default_settings() {
        let core = new_core();
        assert_eq!(core.session.state(), crate::session::SessionState::Disconnected);
        assert_eq!(core.settings().tps, 30);
    }

    #[test]
    fn tick_with_no_session_is_a_no_op() {
        let mut core = new_core();
        core.tick(Instant::now());
        assert_eq!(core.session.state(), crate::session::SessionState::Disconnected);
    }

    #[test]
    fn updating_settings_propagates_to_sender_and_registry() {
        let mut core = new_core();
        let mut settings = core.settings().clone();
        settings.tps = 60;
        settings.hide_practicing = true;
        core.update_settings(settings);
        assert_eq!(core.sender.tps(), 60);
        assert!(core.registry.hide_practicing);
    }

    #[test]
    fn epoch_millis_at_advances_with_the_monotonic_clock() {
        let core = new_core();
        let now = Instant::now();
        let a = core.epoch_millis_at(now);
        let b = core.epoch_millis_at(now + std::time::Duration::from_millis(250));
        assert_eq!(b - a, 250);
    }

    #[test]
    fn logged_in_with_extended_data_rotates_the_stored_authkey() {
        let mut core = new_core();
        assert!(!core.has_authkey());
        core.rotate_authkey(&crypto::base64_encode(b"a fresh server-issued token"));
        assert!(core.has_authkey());
        let first = core.authkey.as_ref().unwrap().0;
        core.rotate_authkey(&crypto::base64_encode(b"a second rotation"));
        assert_ne!(core.authkey.as_ref().unwrap().0, first);
    }
}
