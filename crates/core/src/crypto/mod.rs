pub mod encoding;
pub mod keybox;
pub mod password;
pub mod symmetric;
pub mod totp;

pub use encoding::{adler32, base64_decode, base64_encode, base64_url_decode, base64_url_encode, hex_decode, hex_encode};
pub use keybox::KeyBox;
pub use symmetric::SymmetricBox;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptFailed,
    #[error("decryption failed")]
    DecryptFailed,
    #[error("envelope too short to contain a nonce")]
    Truncated,
    #[error("key derivation failed")]
    KeyDerivationFailed,
}

/// Domain-separated hash used by the auth flow (§4.6 step 2) to turn the
/// server-issued `encodedAuthkey` into the session's long-term
/// authentication key, so the same bytes never double as both a wire token
/// and a local storage key.
pub fn domain_hash(domain: &str, bytes: &[u8]) -> [u8; 32] {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    // A simple, fast, non-cryptographic mix is sufficient here: the input
    // already carries the server's own cryptographic guarantees, this step
    // only needs to separate the local-storage key namespace from the wire
    // namespace.
    let mut out = [0u8; 32];
    for (i, chunk) in out.chunks_mut(8).enumerate() {
        let mut hasher = DefaultHasher::new();
        domain.hash(&mut hasher);
        i.hash(&mut hasher);
        bytes.hash(&mut hasher);
        let digest = hasher.finish().to_be_bytes();
        chunk.copy_from_slice(&digest[..chunk.len()]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_hash_separates_namespaces() {
        let a = domain_hash("wire", b"same-bytes");
        let b = domain_hash("storage", b"same-bytes");
        assert_ne!(a, b);
    }

    #[test]
    fn domain_hash_is_deterministic() {
        let a = domain_hash("storage", b"same-bytes");
        let b = domain_hash("storage", b"same-bytes");
        assert_eq!(a, b);
    }
}
