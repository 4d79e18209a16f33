use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{AppError, AppResult};

const SCHEME: &str = "pbkdf2_sha256";
const ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hashes `password` into `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    encode(password, &salt, ITERATIONS)
}

fn encode(password: &str, salt: &[u8], iterations: u32) -> String {
    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut hash);
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(hash)
    )
}

pub fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let malformed = || AppError::Internal("Malformed password hash".to_string());

    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(malformed());
    };

    if scheme != SCHEME {
        return Err(malformed());
    }
    let iterations: u32 = iterations.parse().map_err(|_| malformed())?;
    let salt = hex::decode(salt).map_err(|_| malformed())?;
    let expected = hex::decode(expected).map_err(|_| malformed())?;

    let mut actual = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual);

    Ok(constant_time_eq(&actual, &expected))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_password() {
        let stored = encode("hunter22", b"0123456789abcdef", 1_000);
        assert!(verify_password("hunter22", &stored).unwrap());
        assert!(!verify_password("hunter23", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(a.starts_with("pbkdf2_sha256$600000$"));
    }

    #[test]
    fn rejects_malformed_hash() {
        assert!(verify_password("x", "not-a-hash").is_err());
        assert!(verify_password("x", "md5$1$00$00").is_err());
        assert!(verify_password("x", "pbkdf2_sha256$abc$00$00").is_err());
    }
}
