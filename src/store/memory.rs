use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityStore, StoreError, TaskStore};
use crate::models::{Identity, Task, TaskQuery, TaskSort};

/// Identity store kept in process memory, keyed by id.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes an identity. Used to exercise tokens whose subject no longer exists.
    pub async fn remove(&self, id: &str) -> Option<Identity> {
        self.identities.write().await.remove(id)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities.values().find(|i| i.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(id).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities.values().any(|i| i.email == email))
    }

    async fn save(&self, identity: Identity) -> Result<Identity, StoreError> {
        let mut identities = self.identities.write().await;
        let taken = identities
            .values()
            .any(|i| i.email == identity.email && i.id != identity.id);
        if taken {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        identities.insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }
}

/// Task store kept in process memory.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        query: &TaskQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut listed: Vec<Task> = tasks
            .values()
            .filter(|t| t.owner_id == owner_id && query.matches(t, now))
            .cloned()
            .collect();

        match query.sort.unwrap_or_default() {
            TaskSort::Created => listed.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            // `None` sorts after every deadline.
            TaskSort::Deadline => listed.sort_by_key(|t| (t.deadline.is_none(), t.deadline)),
        }
        Ok(listed)
    }

    async fn update(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let existing = tasks.get_mut(&task.id).ok_or(StoreError::NotFound)?;
        let owner_id = existing.owner_id.clone();
        let created_at = existing.created_at;
        *existing = Task {
            owner_id,
            created_at,
            ..task
        };
        Ok(existing.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.tasks
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
