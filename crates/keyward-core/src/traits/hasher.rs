//! Password hashing capability.

use crate::result::AppResult;

/// Computes and checks password digests.
///
/// The digest format is owned by the implementation; callers only store and
/// hand it back.
pub trait CredentialHasher: Send + Sync + std::fmt::Debug + 'static {
    /// Hashes a plaintext password.
    fn hash(&self, plain: &str) -> AppResult<String>;

    /// Returns `Ok(true)` if `plain` matches `digest`.
    fn verify(&self, plain: &str, digest: &str) -> AppResult<bool>;
}
