//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::CredentialHasher;

/// [`CredentialHasher`] backed by Argon2id with a random salt per digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    /// Creates a hasher with the library's default Argon2id parameters.
    pub fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, digest: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}
