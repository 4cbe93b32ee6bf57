//! Server Directory (`spec.md` §2 item 6, §4.5): the central-server HTTP
//! client, the derived game-server list, ping/RTT tracking, server
//! selection, and optional relay indirection.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::config::{self, SettingsStore};
use crate::data::{GameServer, RoomState};

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("central-server request failed: {0}")]
    RequestFailed(String),
    #[error("central-server response was malformed: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone)]
pub struct CentralServer {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ServerListEntry {
    id: String,
    name: String,
    address: String,
    region: String,
}

/// Holds the central-server list, the currently active central server,
/// and the derived game-server list (`spec.md` §4.5). Persists the
/// active central/game server selection and a cache of the last fetched
/// list through a [`SettingsStore`].
pub struct ServerDirectory {
    http: reqwest::blocking::Client,
    centrals: Vec<CentralServer>,
    active_central: Option<usize>,
    game_servers: Vec<GameServer>,
    active_game_server_id: Option<String>,
    active_relay: Option<String>,
    next_ping_id: u32,
}

impl ServerDirectory {
    pub fn new(centrals: Vec<CentralServer>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("globed-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client with a fixed timeout and user agent should always build");
        Self {
            http,
            centrals,
            active_central: None,
            game_servers: Vec::new(),
            active_game_server_id: None,
            active_relay: None,
            next_ping_id: 0,
        }
    }

    /// Restores the previously active central/game server and relay from
    /// a settings store. The caller still has to re-fetch the game-server
    /// list; this only seeds the selection.
    pub fn restore_from_store(&mut self, store: &dyn SettingsStore) {
        if let Some(url) = config::load_active_central(store) {
            if let Some(idx) = self.centrals.iter().position(|c| c.url == url) {
                self.active_central = Some(idx);
            }
        }
        self.active_game_server_id = config::load_active_game_server(store);
        self.active_relay = config::load_active_relay(store);
    }

    pub fn persist_to_store(&self, store: &mut dyn SettingsStore) {
        if let Some(central) = self.active_central() {
            config::save_active_central(store, &central.url);
        }
        if let Some(id) = &self.active_game_server_id {
            config::save_active_game_server(store, id);
        }
        match &self.active_relay {
            Some(relay) => config::save_active_relay(store, relay),
            None => config::clear_active_relay(store),
        }
    }

    pub fn active_central(&self) -> Option<&CentralServer> {
        self.active_central.and_then(|i| self.centrals.get(i))
    }

    pub fn set_active_central(&mut self, idx: usize) -> bool {
        if idx < self.centrals.len() {
            self.active_central = Some(idx);
            true
        } else {
            false
        }
    }

    pub fn game_servers(&self) -> &[GameServer] {
        &self.game_servers
    }

    /// `GET /servers?protocol` on the active central server.
    pub fn fetch_game_servers(&mut self) -> Result<(), DirectoryError> {
        let central = self
            .active_central()
            .ok_or_else(|| DirectoryError::RequestFailed("no active central server".into()))?;

        let resp = self
            .http
            .get(format!("{}/servers", central.url))
            .query(&[("protocol", PROTOCOL_VERSION.to_string())])
            .send()
            .map_err(|e| DirectoryError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DirectoryError::RequestFailed(format!("status {}", resp.status())));
        }

        let entries: Vec<ServerListEntry> = resp
            .json()
            .map_err(|e| DirectoryError::MalformedResponse(e.to_string()))?;

        self.game_servers = entries
            .into_iter()
            .map(|e| GameServer::new(e.id, e.name, e.region, e.address))
            .collect();
        Ok(())
    }

    /// Seeds the game-server list from a cached base64 payload (the
    /// `serverResponseCache` persisted key, `SPEC_FULL.md` §6) when no
    /// network is available at startup.
    pub fn load_cached_game_servers(&mut self, base64_payload: &str) -> Result<(), DirectoryError> {
        let bytes = crate::crypto::base64_decode(base64_payload)
            .map_err(|e| DirectoryError::MalformedResponse(e.to_string()))?;
        let entries: Vec<ServerListEntry> =
            serde_json::from_slice(&bytes).map_err(|e| DirectoryError::MalformedResponse(e.to_string()))?;
        self.game_servers = entries
            .into_iter()
            .map(|e| GameServer::new(e.id, e.name, e.region, e.address))
            .collect();
        Ok(())
    }

    pub fn game_server_by_id(&self, id: &str) -> Option<&GameServer> {
        self.game_servers.iter().find(|s| s.id == id)
    }

    fn game_server_by_id_mut(&mut self, id: &str) -> Option<&mut GameServer> {
        self.game_servers.iter_mut().find(|s| s.id == id)
    }

    /// Records a ping sent to `server_id`, returning the ping id to embed
    /// in the outbound `Ping` packet's payload.
    pub fn record_ping_sent(&mut self, server_id: &str, now: Instant) -> Option<u32> {
        let ping_id = self.next_ping_id;
        self.next_ping_id = self.next_ping_id.wrapping_add(1);
        let server = self.game_server_by_id_mut(server_id)?;
        server.record_ping_sent(ping_id, now);
        Some(ping_id)
    }

    /// Records a pong, returning the measured RTT.
    pub fn record_pong(&mut self, server_id: &str, ping_id: u32, now: Instant, player_count: u32) -> Option<Duration> {
        self.game_server_by_id_mut(server_id)?.record_pong(ping_id, now, player_count)
    }

    /// Server selection (`spec.md` §4.5): a non-global room pins the
    /// server by its `RoomSettings::server_id`; the global room uses the
    /// active central server's preferred (first-listed) game server.
    pub fn select_server<'a>(&'a self, room: &RoomState) -> Option<&'a GameServer> {
        if !room.is_global() && room.settings.server_id != 0 {
            let id = room.settings.server_id.to_string();
            return self.game_server_by_id(&id);
        }
        self.active_game_server_id
            .as_deref()
            .and_then(|id| self.game_server_by_id(id))
            .or_else(|| self.game_servers.first())
    }

    pub fn set_active_game_server(&mut self, id: impl Into<String>) {
        self.active_game_server_id = Some(id.into());
    }

    pub fn active_relay(&self) -> Option<&str> {
        self.active_relay.as_deref()
    }

    pub fn set_active_relay(&mut self, relay: impl Into<String>) {
        self.active_relay = Some(relay.into());
    }

    pub fn clear_active_relay(&mut self) {
        self.active_relay = None;
    }

    /// The address a new connection should actually dial: the active
    /// relay if one is set, otherwise the game server's own address
    /// (`spec.md` §4.5 relays).
    pub fn effective_address<'a>(&'a self, server: &'a GameServer) -> &'a str {
        self.active_relay.as_deref().unwrap_or(&server.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;

    fn directory_with_one_server() -> ServerDirectory {
        let mut dir = ServerDirectory::new(vec![CentralServer {
            name: "main".into(),
            url: "https://central.example.com".into(),
        }]);
        dir.set_active_central(0);
        dir.game_servers = vec![GameServer::new(
            "1".into(),
            "EU".into(),
            "europe".into(),
            "game.example.com:4201".into(),
        )];
        dir
    }

    #[test]
    fn global_room_selects_the_preferred_server() {
        let dir = directory_with_one_server();
        let room = RoomState::default();
        let selected = dir.select_server(&room).unwrap();
        assert_eq!(selected.id, "1");
    }

    #[test]
    fn room_with_explicit_server_id_overrides_default() {
        let mut dir = directory_with_one_server();
        dir.game_servers.push(GameServer::new(
            "2".into(),
            "NA".into(),
            "us-east".into(),
            "game2.example.com:4201".into(),
        ));
        let mut room = RoomState {
            room_id: 5,
            ..Default::default()
        };
        room.settings.server_id = 2;
        let selected = dir.select_server(&room).unwrap();
        assert_eq!(selected.id, "2");
    }

    #[test]
    fn relay_overrides_effective_address() {
        let mut dir = directory_with_one_server();
        let server = dir.game_servers[0].clone();
        assert_eq!(dir.effective_address(&server), "game.example.com:4201");
        dir.set_active_relay("relay.example.com:4202");
        assert_eq!(dir.effective_address(&server), "relay.example.com:4202");
        dir.clear_active_relay();
        assert_eq!(dir.effective_address(&server), "game.example.com:4201");
    }

    #[test]
    fn persist_and_restore_roundtrips_through_a_store() {
        let mut dir = directory_with_one_server();
        dir.set_active_game_server("1");
        dir.set_active_relay("relay.example.com:4202");
        let mut store = MemoryStore::default();
        dir.persist_to_store(&mut store);

        let mut restored = ServerDirectory::new(vec![CentralServer {
            name: "main".into(),
            url: "https://central.example.com".into(),
        }]);
        restored.restore_from_store(&store);
        assert_eq!(restored.active_central().unwrap().url, "https://central.example.com");
        assert_eq!(restored.active_relay(), Some("relay.example.com:4202"));
    }
}
