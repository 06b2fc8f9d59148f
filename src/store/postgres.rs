use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{IdentityStore, StoreError, TaskStore};
use crate::models::{Identity, Task, TaskQuery, TaskSort};

const IDENTITY_COLUMNS: &str =
    "id, email, credential_verifier, first_name, last_name, created_at, updated_at";

const TASK_COLUMNS: &str =
    "id, name, description, priority, status, deadline, owner_id, created_at, updated_at";

/// Identity store backed by the `users` table. Email uniqueness is enforced by a
/// unique index on `users.email`.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", IDENTITY_COLUMNS);
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", IDENTITY_COLUMNS);
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let (exists,) =
            sqlx::query_as::<_, (bool,)>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn save(&self, identity: Identity) -> Result<Identity, StoreError> {
        let sql = format!(
            "INSERT INTO users ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                credential_verifier = EXCLUDED.credential_verifier,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = EXCLUDED.updated_at
             RETURNING {cols}",
            cols = IDENTITY_COLUMNS
        );
        let saved = sqlx::query_as::<_, Identity>(&sql)
            .bind(&identity.id)
            .bind(&identity.email)
            .bind(&identity.credential_verifier)
            .bind(&identity.first_name)
            .bind(&identity.last_name)
            .bind(identity.created_at)
            .bind(identity.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(saved)
    }
}

/// Task store backed by the `tasks` table.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, task: Task) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO tasks ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {cols}",
            cols = TASK_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.name)
            .bind(task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.deadline)
            .bind(task.owner_id)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        query: &TaskQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, StoreError> {
        // Conditions are appended in the same order as the binds below.
        let mut sql = format!("SELECT {} FROM tasks WHERE owner_id = $1", TASK_COLUMNS);
        let mut param_count = 2;
        let mut conditions: Vec<String> = Vec::new();

        if query.status.is_some() {
            conditions.push(format!("status = ${}", param_count));
            param_count += 1;
        }
        if query.priority.is_some() {
            conditions.push(format!("priority = ${}", param_count));
            param_count += 1;
        }
        if query.due_after.is_some() {
            conditions.push(format!("deadline >= ${}", param_count));
            param_count += 1;
        }
        if query.due_before.is_some() {
            conditions.push(format!("deadline < ${}", param_count));
            param_count += 1;
        }
        if query.overdue == Some(true) {
            conditions.push(format!("deadline < ${}", param_count));
            param_count += 1;
        }
        if query.search.is_some() {
            conditions.push(format!(
                "(name ILIKE ${0} ESCAPE '\\' OR description ILIKE ${0} ESCAPE '\\')",
                param_count
            ));
        }

        if !conditions.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&conditions.join(" AND "));
        }

        match query.sort.unwrap_or_default() {
            TaskSort::Created => sql.push_str(" ORDER BY created_at DESC"),
            TaskSort::Deadline => sql.push_str(" ORDER BY deadline ASC NULLS LAST"),
        }

        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(owner_id);

        if let Some(status) = query.status {
            query_builder = query_builder.bind(status);
        }
        if let Some(priority) = query.priority {
            query_builder = query_builder.bind(priority);
        }
        if let Some(after) = query.due_after {
            query_builder = query_builder.bind(after);
        }
        if let Some(before) = query.due_before {
            query_builder = query_builder.bind(before);
        }
        if query.overdue == Some(true) {
            query_builder = query_builder.bind(now);
        }
        if let Some(search) = &query.search {
            query_builder = query_builder.bind(contains_pattern(search));
        }

        Ok(query_builder.fetch_all(&self.pool).await?)
    }

    async fn update(&self, task: Task) -> Result<Task, StoreError> {
        let sql = format!(
            "UPDATE tasks
             SET name = $1, description = $2, priority = $3, status = $4, deadline = $5,
                 updated_at = $6
             WHERE id = $7
             RETURNING {}",
            TASK_COLUMNS
        );
        let updated = sqlx::query_as::<_, Task>(&sql)
            .bind(task.name)
            .bind(task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.deadline)
            .bind(task.updated_at)
            .bind(task.id)
            .fetch_optional(&self.pool)
            .await?;
        updated.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Builds an `ILIKE` pattern matching `search` literally anywhere in the text.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
