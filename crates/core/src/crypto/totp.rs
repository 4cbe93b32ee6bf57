use totp_rs::{Algorithm, Secret, TOTP};

use super::CryptoError;

/// Generates the current TOTP code for the stored long-term authkey. The
/// `Login` packet carries this code rather than the raw authkey.
pub fn generate(authkey: &[u8]) -> Result<String, CryptoError> {
    let secret = Secret::Raw(authkey.to_vec())
        .to_bytes()
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    totp.generate_current()
        .map_err(|_| CryptoError::KeyDerivationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_six_digit_code() {
        let code = generate(b"a long enough authkey to be valid").unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
