//! Configuration & Settings (`spec.md` §2 item 13): a typed settings
//! struct plus a key-value persistence port. The core never touches a
//! filesystem or platform API directly; whatever embeds it supplies a
//! `SettingsStore` (a save-file, a registry, a mobile prefs API, ...).

use serde::{Deserialize, Serialize};

/// A key-value persistence port. The embedder owns the actual storage;
/// `globed-core` only ever reads/writes through this interface.
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// An in-memory `SettingsStore`, useful for tests and the harness binary
/// when no real persistence is wired up.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitesFrom {
    Nobody,
    Friends,
    Anyone,
}

impl Default for InvitesFrom {
    fn default() -> Self {
        InvitesFrom::Friends
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    Realtime,
    Lerp,
}

impl Default for InterpolationMode {
    fn default() -> Self {
        InterpolationMode::Lerp
    }
}

/// Settings a player can adjust locally. Persisted via a `SettingsStore`
/// under the `"settings"` key as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub tps: u32,
    pub hide_practicing: bool,
    pub hide_nearby_radius: f32,
    pub proximity_voice: bool,
    pub deafened: bool,
    pub invites_from: InvitesFrom,
    pub interpolation: InterpolationMode,
    pub no_ssl_verify: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            tps: 30,
            hide_practicing: false,
            hide_nearby_radius: 150.0,
            proximity_voice: true,
            deafened: false,
            invites_from: InvitesFrom::default(),
            interpolation: InterpolationMode::default(),
            no_ssl_verify: false,
        }
    }
}

const SETTINGS_KEY: &str = "settings";
const ACTIVE_CENTRAL_KEY: &str = "active_central_server";
const ACTIVE_GAME_SERVER_KEY: &str = "active_game_server";
const LAST_STANDALONE_ADDR_KEY: &str = "last_standalone_address";
const SERVER_LIST_CACHE_KEY: &str = "server_list_cache_b64";
const ACTIVE_RELAY_KEY: &str = "active_relay";
const AUTHKEY_KEY: &str = "authkey_sealed_b64";

/// Persists the long-term authkey sealed under the local fingerprint-
/// derived key (`integrity::local_storage_key`), so it never sits in the
/// save file in plaintext.
pub fn save_sealed_authkey(store: &mut dyn SettingsStore, sealed_b64: &str) {
    store.set(AUTHKEY_KEY, sealed_b64.to_string());
}

pub fn load_sealed_authkey(store: &dyn SettingsStore) -> Option<String> {
    store.get(AUTHKEY_KEY)
}

pub fn clear_sealed_authkey(store: &mut dyn SettingsStore) {
    store.remove(AUTHKEY_KEY);
}

pub fn load_settings(store: &dyn SettingsStore) -> ClientSettings {
    store
        .get(SETTINGS_KEY)
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

pub fn save_settings(store: &mut dyn SettingsStore, settings: &ClientSettings) {
    if let Ok(json) = serde_json::to_string(settings) {
        store.set(SETTINGS_KEY, json);
    }
}

pub fn load_active_central(store: &dyn SettingsStore) -> Option<String> {
    store.get(ACTIVE_CENTRAL_KEY)
}

pub fn save_active_central(store: &mut dyn SettingsStore, url: &str) {
    store.set(ACTIVE_CENTRAL_KEY, url.to_string());
}

pub fn load_active_game_server(store: &dyn SettingsStore) -> Option<String> {
    store.get(ACTIVE_GAME_SERVER_KEY)
}

pub fn save_active_game_server(store: &mut dyn SettingsStore, id: &str) {
    store.set(ACTIVE_GAME_SERVER_KEY, id.to_string());
}

pub fn load_last_standalone_address(store: &dyn SettingsStore) -> Option<String> {
    store.get(LAST_STANDALONE_ADDR_KEY)
}

pub fn save_last_standalone_address(store: &mut dyn SettingsStore, addr: &str) {
    store.set(LAST_STANDALONE_ADDR_KEY, addr.to_string());
}

pub fn load_server_list_cache(store: &dyn SettingsStore) -> Option<String> {
    store.get(SERVER_LIST_CACHE_KEY)
}

pub fn save_server_list_cache(store: &mut dyn SettingsStore, base64_payload: &str) {
    store.set(SERVER_LIST_CACHE_KEY, base64_payload.to_string());
}

pub fn load_active_relay(store: &dyn SettingsStore) -> Option<String> {
    store.get(ACTIVE_RELAY_KEY)
}

pub fn save_active_relay(store: &mut dyn SettingsStore, relay: &str) {
    store.set(ACTIVE_RELAY_KEY, relay.to_string());
}

pub fn clear_active_relay(store: &mut dyn SettingsStore) {
    store.remove(ACTIVE_RELAY_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_roundtrip_through_store() {
        let mut store = MemoryStore::default();
        save_settings(&mut store, &ClientSettings::default());
        let loaded = load_settings(&store);
        assert_eq!(loaded.tps, 30);
        assert_eq!(loaded.invites_from, InvitesFrom::Friends);
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let store = MemoryStore::default();
        let settings = load_settings(&store);
        assert_eq!(settings.tps, ClientSettings::default().tps);
    }

    #[test]
    fn clearing_relay_removes_it() {
        let mut store = MemoryStore::default();
        save_active_relay(&mut store, "relay.example.com:4202");
        assert!(load_active_relay(&store).is_some());
        clear_active_relay(&mut store);
        assert!(load_active_relay(&store).is_none());
    }

    #[test]
    fn sealed_authkey_roundtrips_and_clears() {
        let mut store = MemoryStore::default();
        assert!(load_sealed_authkey(&store).is_none());
        save_sealed_authkey(&mut store, "c2VhbGVkLWJ5dGVz");
        assert_eq!(load_sealed_authkey(&store).as_deref(), Some("c2VhbGVkLWJ5dGVz"));
        clear_sealed_authkey(&mut store);
        assert!(load_sealed_authkey(&store).is_none());
    }
}
