use argon2::Argon2;

use super::symmetric::{SymmetricBox, KEY_SIZE};
use super::CryptoError;

/// Derives a [`SymmetricBox`] key from a user-supplied password and a salt
/// (the platform fingerprint, see `SPEC_FULL.md` §9 — local-only, never
/// sent on the wire). Used to encrypt persisted tokens at rest.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_SIZE], CryptoError> {
    let mut key = [0u8; KEY_SIZE];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(key)
}

pub fn derive_box(password: &str, salt: &[u8]) -> Result<SymmetricBox, CryptoError> {
    Ok(SymmetricBox::new(derive_key(password, salt)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_and_salt_derive_the_same_key() {
        let a = derive_key("hunter2", b"some-salt-bytes!").unwrap();
        let b = derive_key("hunter2", b"some-salt-bytes!").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_derive_different_keys() {
        let a = derive_key("hunter2", b"salt-one-bytes..").unwrap();
        let b = derive_key("hunter2", b"salt-two-bytes..").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn derived_box_round_trips() {
        let key_box = derive_box("hunter2", b"some-salt-bytes!").unwrap();
        let sealed = key_box.seal(b"token contents").unwrap();
        assert_eq!(key_box.open(&sealed).unwrap(), b"token contents");
    }
}
