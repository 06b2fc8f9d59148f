use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::AccessDenied;
use crate::config::AuthSettings;
use crate::error::AppError;
use crate::models::Identity;

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token: the identity's email.
    pub sub: String,
    /// The identity's id.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch). The token is invalid from this instant on.
    pub exp: i64,
}

/// Issues and validates HS256 session tokens.
///
/// The codec holds only the signing key and TTL, both fixed at construction. Validation
/// takes the current time as a parameter and performs no I/O, so a single codec can be
/// shared across threads.
///
/// There is no revocation: a token stays valid until `exp` even if the password changes.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    peek_validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(signing_key: &SecretString, ttl: Duration) -> Self {
        let secret = signing_key.expose_secret().as_bytes();

        // Expiry is checked against the caller's `now`, not the system clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let mut peek_validation = Validation::new(Algorithm::HS256);
        peek_validation.insecure_disable_signature_validation();
        peek_validation.validate_exp = false;
        peek_validation.validate_aud = false;
        peek_validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            peek_validation,
            ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(&settings.signing_key, settings.token_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generates a token for `identity`, valid from `now` (truncated to whole seconds)
    /// for one TTL.
    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, AppError> {
        let issued_at = now.timestamp();
        let claims = Claims {
            sub: identity.email.clone(),
            user_id: identity.id.clone(),
            iat: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verifies a token and returns its claims.
    ///
    /// Checks run in order: well-formedness, signature, expiry, then that the token was
    /// issued to `expected_subject_id`.
    pub fn validate(
        &self,
        token: &str,
        expected_subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, AccessDenied> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)?;

        if now.timestamp() >= claims.exp {
            return Err(AccessDenied::Expired);
        }
        if claims.user_id != expected_subject_id {
            return Err(AccessDenied::SubjectMismatch);
        }
        Ok(claims)
    }

    /// Reads the subject id a token claims, without checking the signature.
    ///
    /// The result is untrusted and is only good for choosing what to pass to
    /// [`TokenCodec::validate`].
    pub fn claimed_subject(&self, token: &str) -> Result<String, AccessDenied> {
        decode::<Claims>(token, &self.decoding_key, &self.peek_validation)
            .map(|data| data.claims.user_id)
            .map_err(|_| AccessDenied::Malformed)
    }
}

fn classify(error: jsonwebtoken::errors::Error) -> AccessDenied {
    match error.kind() {
        ErrorKind::InvalidSignature => AccessDenied::BadSignature,
        ErrorKind::ExpiredSignature => AccessDenied::Expired,
        _ => AccessDenied::Malformed,
    }
}
