//! Opaque single-use secrets: refresh tokens and invitation tokens.
//!
//! Only the SHA-256 of a secret is ever stored.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Random bytes per secret.
const SECRET_BYTES: usize = 32;

/// Generates a fresh hex-encoded random secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 of a secret, used as its lookup key.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}
