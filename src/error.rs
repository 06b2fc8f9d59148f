//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! It is the transport-level error: authentication and authorization outcomes are produced
//! as the tagged [`AccessDenied`](crate::auth::AccessDenied) result and only become an
//! `AppError` at the HTTP boundary.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies.
//! `From` implementations for `AccessDenied`, `StoreError`,
//! `validator::ValidationErrors`, `jsonwebtoken::errors::Error` and `bcrypt::BcryptError`
//! allow easy conversion using the `?` operator.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::AccessDenied;
use crate::store::StoreError;

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific type of error, often carrying a message
/// detailing the issue. These errors are then converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Represents an unauthorized access attempt (HTTP 401).
    /// Used when authentication fails or a session token is rejected.
    Unauthorized(String),
    /// Represents a client-side error due to a malformed or invalid request (HTTP 400).
    BadRequest(String),
    /// Represents a situation where a requested resource was not found (HTTP 404).
    /// Resources owned by another identity are reported the same way.
    NotFound(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error due to failed input validation (HTTP 422 Unprocessable Entity).
    ValidationError(String),
    /// A collaborator store could not be reached in time (HTTP 503).
    /// This is the only transient kind; callers may retry.
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::InternalServerError(msg) => HttpResponse::InternalServerError().json(json!({
                "error": msg
            })),
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
            AppError::ServiceUnavailable(msg) => HttpResponse::ServiceUnavailable().json(json!({
                "error": msg
            })),
        }
    }
}

/// Converts an authentication/authorization outcome into its HTTP rejection.
///
/// Every credential and token failure collapses into a 401 so that the response does not
/// reveal which check failed. `NotOwner` becomes a 404, indistinguishable from a missing
/// resource.
impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> AppError {
        match denied {
            AccessDenied::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".into())
            }
            AccessDenied::Malformed
            | AccessDenied::BadSignature
            | AccessDenied::Expired
            | AccessDenied::SubjectMismatch
            | AccessDenied::UnknownSubject => {
                AppError::Unauthorized("Invalid or expired token".into())
            }
            AccessDenied::NotOwner => AppError::NotFound("Resource not found".into()),
            AccessDenied::StoreUnavailable(msg) => {
                log::error!("identity store unavailable: {}", msg);
                AppError::ServiceUnavailable("Identity store unavailable".into())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::NotFound => AppError::NotFound("Record not found".into()),
            StoreError::Conflict(msg) => AppError::BadRequest(msg),
            StoreError::Unavailable(msg) => {
                log::error!("store unavailable: {}", msg);
                AppError::ServiceUnavailable("Store unavailable".into())
            }
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Token encoding failures are server-side faults; decoding failures never reach here
/// because the codec turns them into [`AccessDenied`].
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::InternalServerError(format!("Failed to issue token: {}", error))
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(format!("Failed to hash password: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_responses() {
        let error = AppError::Unauthorized("Invalid token".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::BadRequest("Invalid input".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::NotFound("Resource not found".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::InternalServerError("Server error".into());
        assert_eq!(error.error_response().status(), 500);

        let error = AppError::ValidationError("bad".into());
        assert_eq!(error.error_response().status(), 422);

        let error = AppError::ServiceUnavailable("down".into());
        assert_eq!(error.error_response().status(), 503);
    }

    #[test]
    fn test_access_denied_mapping() {
        let cases = [
            (AccessDenied::InvalidCredentials, 401),
            (AccessDenied::Malformed, 401),
            (AccessDenied::BadSignature, 401),
            (AccessDenied::Expired, 401),
            (AccessDenied::SubjectMismatch, 401),
            (AccessDenied::UnknownSubject, 401),
            (AccessDenied::NotOwner, 404),
            (AccessDenied::StoreUnavailable("timeout".into()), 503),
        ];
        for (denied, status) in cases {
            let label = denied.to_string();
            let response = AppError::from(denied).error_response();
            assert_eq!(response.status(), status, "mapping for {}", label);
        }
    }

    #[test]
    fn test_store_error_mapping() {
        let conflict = AppError::from(StoreError::Conflict("Email already registered".into()));
        assert!(matches!(conflict, AppError::BadRequest(ref m) if m == "Email already registered"));

        let unavailable = AppError::from(StoreError::Unavailable("refused".into()));
        assert_eq!(unavailable.error_response().status(), 503);
    }
}
