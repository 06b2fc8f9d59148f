pub mod authority;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

// Re-export necessary items
pub use authority::{AccessAuthority, Principal};
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{CredentialHasher, MAX_SECRET_BYTES};
pub use token::{Claims, TokenCodec};

lazy_static! {
    // Letters (any script), spaces, apostrophes and hyphens
    static ref NAME_REGEX: regex::Regex = regex::Regex::new(r"^[\p{L}][\p{L} '\-]*$").unwrap();
}

/// Rejects passwords longer than bcrypt can distinguish. `length` counts characters, so
/// the byte limit needs its own check.
fn validate_secret_bytes(secret: &str) -> Result<(), ValidationError> {
    if secret.len() > MAX_SECRET_BYTES {
        let mut err = ValidationError::new("password_too_long");
        err.message = Some(format!("Password must not exceed {} bytes", MAX_SECRET_BYTES).into());
        return Err(err);
    }
    Ok(())
}

/// Why an authentication or authorization attempt was refused.
///
/// Every variant except `StoreUnavailable` is permanent for the given input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// Unknown email or wrong secret. The two are deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match its claims")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token was issued to a different subject")]
    SubjectMismatch,

    /// The token is genuine but its subject no longer exists in the identity store.
    #[error("token subject no longer exists")]
    UnknownSubject,

    /// Authenticated, but not the owner of the requested resource.
    #[error("requester does not own the resource")]
    NotOwner,

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AccessDenied {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AccessDenied::StoreUnavailable(_))
    }
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    /// At least 6 characters and at most 72 bytes.
    #[validate(length(min = 6), custom = "validate_secret_bytes")]
    pub password: String,
    #[validate(
        length(min = 1, max = 50),
        regex(path = "NAME_REGEX", message = "Name may only contain letters, spaces, apostrophes or hyphens")
    )]
    pub first_name: String,
    #[validate(
        length(min = 1, max = 50),
        regex(path = "NAME_REGEX", message = "Name may only contain letters, spaces, apostrophes or hyphens")
    )]
    pub last_name: String,
}

/// Payload for changing the authenticated user's password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6), custom = "validate_secret_bytes")]
    pub new_password: String,
}

/// Response after registration: the session token and the new account's id.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Response after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}
