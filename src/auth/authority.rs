//! Composition of credential hashing, session tokens and the identity store into the
//! checks the rest of the service relies on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use super::{AccessDenied, Claims, CredentialHasher, TokenCodec};
use crate::config::AuthSettings;
use crate::error::AppError;
use crate::models::{normalize_email, Identity};
use crate::store::{IdentityStore, StoreError};

/// The identity a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    fn from_claims(claims: Claims) -> Self {
        Self {
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            id: claims.user_id,
            email: claims.sub,
        }
    }
}

/// Verified against on logins for unknown emails so they cost as much as a wrong password.
const DECOY_SECRET: &str = "decoy-secret-for-unknown-accounts";

pub struct AccessAuthority {
    identities: Arc<dyn IdentityStore>,
    hasher: CredentialHasher,
    decoy_verifier: String,
    codec: TokenCodec,
    store_timeout: Duration,
    resolve_subject: bool,
}

impl AccessAuthority {
    pub fn new(identities: Arc<dyn IdentityStore>, settings: &AuthSettings) -> Self {
        let hasher = CredentialHasher::new(settings.hash_cost);
        let decoy_verifier = hasher.hash(DECOY_SECRET).unwrap_or_else(|e| {
            log::error!("failed to prepare decoy verifier: {}", e);
            String::new()
        });

        Self {
            identities,
            hasher,
            decoy_verifier,
            codec: TokenCodec::from_settings(settings),
            store_timeout: settings.store_timeout,
            resolve_subject: settings.resolve_subject,
        }
    }

    /// Runs one identity-store call, failing as `Unavailable` if it does not finish
    /// within the configured timeout.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "no response within {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }

    /// Checks an email/secret pair and returns the matching identity.
    ///
    /// Unknown emails and wrong secrets both yield `InvalidCredentials`; only the log
    /// tells them apart.
    pub async fn authenticate(&self, email: &str, secret: &str) -> Result<Identity, AccessDenied> {
        let email = normalize_email(email);
        let found = self
            .bounded(self.identities.find_by_email(&email))
            .await
            .map_err(|e| AccessDenied::StoreUnavailable(e.to_string()))?;

        let identity = match found {
            Some(identity) => identity,
            None => {
                self.hasher.verify(secret, &self.decoy_verifier);
                log::debug!("login rejected for {}: no such account", email);
                return Err(AccessDenied::InvalidCredentials);
            }
        };

        if !self.hasher.verify(secret, &identity.credential_verifier) {
            log::debug!("login rejected for {}: password mismatch", email);
            return Err(AccessDenied::InvalidCredentials);
        }

        log::info!("user {} authenticated", identity.id);
        Ok(identity)
    }

    pub fn issue_session(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, AppError> {
        self.codec.issue(identity, now)
    }

    /// Validates a bearer token against the subject it claims.
    pub async fn authorize_request(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, AccessDenied> {
        let claimed = self.codec.claimed_subject(token)?;
        self.authorize_subject(token, &claimed, now).await
    }

    /// Validates a bearer token that must have been issued to `expected_subject_id`.
    ///
    /// When subject resolution is enabled the id is looked up again so that tokens of
    /// deleted accounts stop working before they expire.
    pub async fn authorize_subject(
        &self,
        token: &str,
        expected_subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, AccessDenied> {
        let claims = self.codec.validate(token, expected_subject_id, now)?;
        if !self.resolve_subject {
            return Ok(Principal::from_claims(claims));
        }

        let resolved = self
            .bounded(self.identities.find_by_id(&claims.user_id))
            .await
            .map_err(|e| AccessDenied::StoreUnavailable(e.to_string()))?;

        match resolved {
            Some(identity) => {
                let mut principal = Principal::from_claims(claims);
                principal.email = identity.email;
                Ok(principal)
            }
            None => {
                log::warn!("token presented for deleted account {}", claims.user_id);
                Err(AccessDenied::UnknownSubject)
            }
        }
    }

    /// Allows access only when `principal` owns the resource.
    ///
    /// Callers must report `NotOwner` exactly like a missing resource.
    pub fn authorize_ownership(
        &self,
        principal: &Principal,
        resource_owner_id: &str,
    ) -> Result<(), AccessDenied> {
        if principal.id == resource_owner_id {
            Ok(())
        } else {
            Err(AccessDenied::NotOwner)
        }
    }

    /// Creates an account. The email is normalized and must not already be registered.
    pub async fn register(
        &self,
        email: &str,
        secret: &str,
        first_name: String,
        last_name: String,
    ) -> Result<Identity, AppError> {
        let email = normalize_email(email);
        if self.bounded(self.identities.exists_by_email(&email)).await? {
            return Err(AppError::BadRequest("Email already registered".into()));
        }

        let verifier = self.hasher.hash(secret)?;
        let identity = Identity::new(&email, verifier, first_name, last_name);
        let saved = self.bounded(self.identities.save(identity)).await?;

        log::info!("registered user {}", saved.id);
        Ok(saved)
    }

    /// Loads the full account record for an authenticated principal.
    pub async fn identity_of(&self, principal: &Principal) -> Result<Identity, AppError> {
        self.bounded(self.identities.find_by_id(&principal.id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Replaces the principal's secret after checking the current one.
    ///
    /// Tokens issued before the change stay valid until they expire.
    pub async fn change_secret(
        &self,
        principal: &Principal,
        current_secret: &str,
        new_secret: &str,
    ) -> Result<Identity, AppError> {
        let mut identity = self.identity_of(principal).await?;
        if !self.hasher.verify(current_secret, &identity.credential_verifier) {
            return Err(AccessDenied::InvalidCredentials.into());
        }

        identity.credential_verifier = self.hasher.hash(new_secret)?;
        identity.updated_at = Utc::now();
        let saved = self.bounded(self.identities.save(identity)).await?;

        log::info!("user {} changed password", saved.id);
        Ok(saved)
    }
}
