use crate::error::AppError;
use bcrypt::{hash, verify};

/// bcrypt only reads this many bytes of its input; anything longer is rejected.
pub const MAX_SECRET_BYTES: usize = 72;

/// One-way, salted credential hashing.
///
/// Each call to [`CredentialHasher::hash`] draws a fresh salt, so equal secrets produce
/// different verifiers. The salt and cost are embedded in the verifier string.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hashes a non-empty secret of at most [`MAX_SECRET_BYTES`] bytes into a storable
    /// verifier.
    pub fn hash(&self, secret: &str) -> Result<String, AppError> {
        if secret.is_empty() {
            return Err(AppError::BadRequest("Password must not be empty".into()));
        }
        if secret.len() > MAX_SECRET_BYTES {
            return Err(AppError::BadRequest(format!(
                "Password must not exceed {} bytes",
                MAX_SECRET_BYTES
            )));
        }
        Ok(hash(secret, self.cost)?)
    }

    /// Checks `secret` against a stored verifier.
    ///
    /// bcrypt compares digests in constant time. A verifier that does not parse counts as
    /// a mismatch, and so does a secret too long to have been hashed.
    pub fn verify(&self, secret: &str, verifier: &str) -> bool {
        if secret.len() > MAX_SECRET_BYTES {
            return false;
        }
        match verify(secret, verifier) {
            Ok(matched) => matched,
            Err(e) => {
                log::warn!("stored credential verifier is malformed: {}", e);
                false
            }
        }
    }
}
