use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};

use super::CryptoError;

const NONCE_SIZE: usize = 12;
pub const KEY_SIZE: usize = 32;

/// An authenticated symmetric box: AES-256-GCM with a random nonce prepended
/// to the ciphertext on the wire. Used for the `encrypted` flag on packets
/// (voice, chat) once a session key has been established.
#[derive(Clone)]
pub struct SymmetricBox {
    cipher: Aes256Gcm,
}

impl SymmetricBox {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        let key = Key::<Aes256Gcm>::from(key);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let mut ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.append(&mut ciphertext);
        Ok(out)
    }

    /// Decrypts a `nonce || ciphertext` envelope produced by [`seal`](Self::seal).
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_SIZE {
            return Err(CryptoError::Truncated);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key_box = SymmetricBox::new([7u8; KEY_SIZE]);
        let plaintext = b"push to talk frame";
        let sealed = key_box.seal(plaintext).unwrap();
        let opened = key_box.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let key_box = SymmetricBox::new([1u8; KEY_SIZE]);
        let mut sealed = key_box.seal(b"hello").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(key_box.open(&sealed).is_err());
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let key_box = SymmetricBox::new([1u8; KEY_SIZE]);
        assert!(matches!(key_box.open(&[0u8; 4]), Err(CryptoError::Truncated)));
    }
}
