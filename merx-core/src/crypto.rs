use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use rand::{TryRngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;

/// Password hashing for the identity core.
///
/// The digest is HMAC-SHA-256 over the UTF-8 password, keyed by the
/// user's stored salt. There is no shared mutable primitive: every
/// call is a pure function of `(plaintext, salt)`, so concurrent
/// workflows never contend on hashing state.
///
/// Flow contract: registration and every password set generate a fresh
/// salt via [`new_salt`]; login and old-password verification reuse the
/// salt stored on the user being authenticated.
type HmacSha256 = Hmac<Sha256>;

/// Salt length matches the HMAC-SHA-256 block size, the largest key
/// the primitive uses without pre-hashing.
pub const SALT_LENGTH: usize = 64;

/// Length of the MAC output.
pub const DIGEST_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("operating system RNG failure")]
    Rng,
    #[error("salt must not be empty")]
    EmptySalt,
}

/// Generate a fresh random salt from the OS RNG.
pub fn new_salt() -> Result<Vec<u8>, CryptoError> {
    let mut salt = vec![0u8; SALT_LENGTH];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|_| CryptoError::Rng)?;
    Ok(salt)
}

/// Derive the keyed digest of a plaintext password under a salt.
pub fn digest(plaintext: &str, salt: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if salt.is_empty() {
        return Err(CryptoError::EmptySalt);
    }
    let mut mac = HmacSha256::new_from_slice(salt)
        .map_err(|_| CryptoError::EmptySalt)?;
    mac.update(plaintext.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify a plaintext against a stored digest and salt.
///
/// Digests are fixed-length byte sequences compared in full, so the
/// comparison does not leak the mismatch position.
pub fn verify(plaintext: &str, salt: &[u8], expected: &[u8]) -> Result<bool, CryptoError> {
    let computed = digest(plaintext, salt)?;
    if computed.len() != expected.len() {
        return Ok(false);
    }
    Ok(constant_time_eq(&computed, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let salt = new_salt().unwrap();
        let a = digest("correct horse", &salt).unwrap();
        let b = digest("correct horse", &salt).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIGEST_LENGTH);
    }

    #[test]
    fn different_passwords_diverge_under_the_same_salt() {
        let salt = new_salt().unwrap();
        let a = digest("correct horse", &salt).unwrap();
        let b = digest("battery staple", &salt).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_salts_diverge_for_the_same_password() {
        let a = digest("correct horse", &new_salt().unwrap()).unwrap();
        let b = digest("correct horse", &new_salt().unwrap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_the_original_and_rejects_others() {
        let salt = new_salt().unwrap();
        let stored = digest("correct horse", &salt).unwrap();
        assert!(verify("correct horse", &salt, &stored).unwrap());
        assert!(!verify("battery staple", &salt, &stored).unwrap());
        assert!(!verify("correct horse", &salt, &stored[..16]).unwrap());
    }

    #[test]
    fn rejects_empty_salts() {
        assert!(matches!(digest("pw", &[]), Err(CryptoError::EmptySalt)));
    }

    #[test]
    fn salts_are_block_sized_and_random() {
        let a = new_salt().unwrap();
        let b = new_salt().unwrap();
        assert_eq!(a.len(), SALT_LENGTH);
        assert_ne!(a, b);
    }
}
