use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Pending pings older than this are dropped from a `GameServer`'s
/// tracking set even if no reply ever arrives (`spec.md` §4.5 "stale
/// entries are evicted past a cap").
const PING_STALE_CAP: Duration = Duration::from_secs(30);

/// One entry in the central server's game-server list.
#[derive(Debug, Clone)]
pub struct GameServer {
    pub id: String,
    pub name: String,
    pub region: String,
    pub address: String,
    /// -1 means unknown (no reply yet).
    pub ping: i32,
    pub player_count: u32,
    pending_pings: HashMap<u32, Instant>,
}

impl GameServer {
    pub fn new(id: String, name: String, region: String, address: String) -> Self {
        Self {
            id,
            name,
            region,
            address,
            ping: -1,
            player_count: 0,
            pending_pings: HashMap::new(),
        }
    }

    pub fn record_ping_sent(&mut self, ping_id: u32, at: Instant) {
        self.pending_pings.insert(ping_id, at);
        // evict stale entries so an unanswered ping storm can't grow unbounded
        self.pending_pings
            .retain(|_, sent| at.duration_since(*sent) < PING_STALE_CAP);
    }

    pub fn record_pong(&mut self, ping_id: u32, now: Instant, player_count: u32) -> Option<std::time::Duration> {
        self.player_count = player_count;
        let sent = self.pending_pings.remove(&ping_id)?;
        let rtt = now.duration_since(sent);
        self.ping = rtt.as_millis() as i32;
        Some(rtt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_starts_unknown() {
        let server = GameServer::new("a".into(), "A".into(), "eu".into(), "1.2.3.4:1".into());
        assert_eq!(server.ping, -1);
    }

    #[test]
    fn pong_without_matching_ping_is_ignored() {
        let mut server = GameServer::new("a".into(), "A".into(), "eu".into(), "1.2.3.4:1".into());
        let now = Instant::now();
        assert!(server.record_pong(1, now, 5).is_none());
        assert_eq!(server.player_count, 5);
    }

    #[test]
    fn pong_computes_rtt() {
        let mut server = GameServer::new("a".into(), "A".into(), "eu".into(), "1.2.3.4:1".into());
        let sent = Instant::now();
        server.record_ping_sent(1, sent);
        let rtt = server.record_pong(1, sent + std::time::Duration::from_millis(40), 3);
        assert!(rtt.is_some());
        assert_eq!(server.ping, 40);
    }
}
