//! Password hashing and verification using PBKDF2-HMAC-SHA256.
//!
//! Encoded form: `pbkdf2_sha256$<iterations>$<b64 salt>$<b64 key>`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ALGORITHM: &str = "pbkdf2_sha256";
const ITERATIONS: u32 = 50_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Hash a password with a random 16-byte salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut key);

    format!(
        "{ALGORITHM}${ITERATIONS}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(key)
    )
}

/// Verify a password against an encoded hash. Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let parts: Vec<&str> = encoded.split('$').collect();
    let [algorithm, iterations, salt, key] = parts.as_slice() else {
        return false;
    };
    if *algorithm != ALGORITHM {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(key)) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }

    let mut derived = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut derived);
    derived.ct_eq(&expected).into()
}
