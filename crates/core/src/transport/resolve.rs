use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use super::TransportError;

const RESOLVE_TTL: Duration = Duration::from_secs(60);

/// Caches DNS resolutions with a short TTL so a reconnect storm doesn't
/// hammer the resolver.
#[derive(Default)]
pub struct ResolveCache {
    entries: HashMap<String, (Vec<SocketAddr>, Instant)>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, host_port: &str) -> Result<Vec<SocketAddr>, TransportError> {
        if let Some((addrs, at)) = self.entries.get(host_port) {
            if at.elapsed() < RESOLVE_TTL {
                return Ok(addrs.clone());
            }
        }

        let addrs: Vec<SocketAddr> = host_port
            .to_socket_addrs()
            .map_err(|e| TransportError::ResolveFailed(e.to_string()))?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::ResolveFailed(format!(
                "no addresses for {host_port}"
            )));
        }

        self.entries
            .insert(host_port.to_string(), (addrs.clone(), Instant::now()));
        Ok(addrs)
    }

    pub fn invalidate(&mut self, host_port: &str) {
        self.entries.remove(host_port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_localhost_succeeds() {
        let mut cache = ResolveCache::new();
        let addrs = cache.resolve("localhost:80").unwrap();
        assert!(!addrs.is_empty());
    }

    #[test]
    fn unresolvable_host_surfaces_resolve_failed() {
        let mut cache = ResolveCache::new();
        let err = cache.resolve("not a valid host : not a port").unwrap_err();
        assert!(matches!(err, TransportError::ResolveFailed(_)));
    }
}
