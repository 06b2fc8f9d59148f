//! Persistence collaborators.
//!
//! The access core only ever talks to storage through [`IdentityStore`]; task handlers use
//! [`TaskStore`] after the ownership check has passed. Both have a Postgres implementation
//! for deployments and an in-memory implementation for tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Identity, Task, TaskQuery};

pub use memory::{InMemoryIdentityStore, InMemoryTaskStore};
pub use postgres::{PgIdentityStore, PgTaskStore};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict("Email already registered".into())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Lookup and persistence of accounts.
///
/// Emails passed in are already normalized. Implementations enforce email uniqueness.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;

    /// Inserts or updates by id and returns the stored record.
    async fn save(&self, identity: Identity) -> Result<Identity, StoreError>;
}

/// Task persistence. Callers must have passed `AccessAuthority::authorize_ownership`
/// before reading or mutating a task fetched by id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: Task) -> Result<Task, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn list_for_owner(
        &self,
        owner_id: &str,
        query: &TaskQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError>;

    /// Updates the editable fields of an existing task. The owner column is never written.
    async fn update(&self, task: Task) -> Result<Task, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
