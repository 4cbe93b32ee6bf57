use rand_core::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use super::symmetric::SymmetricBox;

/// A key-agreement keypair used for the `CryptoHandshakeStart` /
/// `CryptoHandshakeResponse` exchange. Produces a [`SymmetricBox`] once the
/// peer's public key is known.
pub struct KeyBox {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyBox {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Derives the shared [`SymmetricBox`] with a peer given their raw
    /// 32-byte X25519 public key.
    pub fn derive_shared(&self, peer_public: [u8; 32]) -> SymmetricBox {
        let peer = PublicKey::from(peer_public);
        let shared = self.secret.diffie_hellman(&peer);
        SymmetricBox::new(*shared.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_derive_the_same_box() {
        let alice = KeyBox::generate();
        let bob = KeyBox::generate();

        let alice_box = alice.derive_shared(bob.public_key_bytes());
        let bob_box = bob.derive_shared(alice.public_key_bytes());

        let sealed = alice_box.seal(b"hello bob").unwrap();
        let opened = bob_box.open(&sealed).unwrap();
        assert_eq!(opened, b"hello bob");
    }

    #[test]
    fn mismatched_keypairs_derive_different_boxes() {
        let alice = KeyBox::generate();
        let bob = KeyBox::generate();
        let eve = KeyBox::generate();

        let alice_box = alice.derive_shared(bob.public_key_bytes());
        let eve_box = eve.derive_shared(bob.public_key_bytes());

        let sealed = alice_box.seal(b"secret").unwrap();
        assert!(eve_box.open(&sealed).is_err());
    }
}
