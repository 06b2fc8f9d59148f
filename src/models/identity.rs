use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account.
///
/// `credential_verifier` is the salted bcrypt hash of the account secret. It is never
/// serialized into responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub credential_verifier: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Creates a not-yet-persisted identity with a fresh id.
    /// `email` is stored in its normalized form.
    pub fn new(
        email: &str,
        credential_verifier: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            credential_verifier,
            first_name,
            last_name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Emails are unique and compared case-insensitively; every lookup goes through this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn test_verifier_is_not_serialized() {
        let identity = Identity::new(
            "Jo@Example.com",
            "$2b$04$verifier".to_string(),
            "Jo".to_string(),
            "Doe".to_string(),
        );
        assert_eq!(identity.email, "jo@example.com");

        let json = serde_json::to_value(&identity).unwrap();
        assert!(json.get("credential_verifier").is_none());
        assert_eq!(json["email"], "jo@example.com");
    }
}
