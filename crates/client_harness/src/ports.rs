//! Trivial port implementations for the harness: a hostname-derived
//! fingerprint (real embedders use a hardware id; this binary has no such
//! thing to read) and a messenger that just prints the proof instead of
//! calling out to a real messaging backend.

use globed_core::auth::{AuthError, MessagePort};
use globed_core::integrity::FingerprintPort;

pub struct HostnameFingerprint;

impl FingerprintPort for HostnameFingerprint {
    fn compute(&self) -> Option<[u8; 32]> {
        let hostname = std::env::var("HOSTNAME").or_else(|_| std::env::var("COMPUTERNAME")).ok()?;
        let digest = globed_core::crypto::adler32(hostname.as_bytes());
        let mut out = [0u8; 32];
        out[..4].copy_from_slice(&digest.to_be_bytes());
        Some(out)
    }
}

/// Stands in for the game's own private-messaging backend (`spec.md`
/// §4.6 step 2). The harness has no such backend to call, so it prints
/// the proof message a real embedder would upload.
pub struct StdoutMessenger;

impl MessagePort for StdoutMessenger {
    fn upload_message(&mut self, target_account_id: i32, body: &str) -> Result<String, AuthError> {
        println!("[auth] would upload proof message to account {target_account_id}: {body}");
        Ok("harness-message-0".into())
    }

    fn delete_message(&mut self, message_id: &str) -> Result<(), AuthError> {
        println!("[auth] would delete proof message {message_id}");
        Ok(())
    }
}
