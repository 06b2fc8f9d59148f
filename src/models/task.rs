use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Pending,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed.
    Completed,
}

/// Input structure for creating or updating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub deadline: Option<DateTime<Utc>>,

    /// Defaults to `pending` when omitted.
    #[serde(default)]
    pub status: TaskStatus,
}

/// A task as stored and returned by the API.
///
/// `owner_id` is set at creation and never changes afterwards; every read or
/// mutation is checked against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ordering for task listings.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskSort {
    /// Newest first.
    #[default]
    Created,
    /// Earliest deadline first, tasks without a deadline last.
    Deadline,
}

/// Query parameters for filtering the authenticated user's tasks.
/// Listing is always scoped to the caller; there is no owner filter.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Only tasks whose deadline is at or after this instant.
    pub due_after: Option<DateTime<Utc>>,
    /// Only tasks whose deadline is before this instant.
    pub due_before: Option<DateTime<Utc>>,
    /// Only tasks whose deadline has already passed.
    pub overdue: Option<bool>,
    /// Case-insensitive match against name or description.
    pub search: Option<String>,
    pub sort: Option<TaskSort>,
}

impl TaskQuery {
    /// Whether `task` passes every filter in this query.
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some() && self.priority != task.priority {
            return false;
        }
        if let Some(after) = self.due_after {
            if !task.deadline.is_some_and(|d| d >= after) {
                return false;
            }
        }
        if let Some(before) = self.due_before {
            if !task.deadline.is_some_and(|d| d < before) {
                return false;
            }
        }
        if self.overdue == Some(true) && !task.deadline.is_some_and(|d| d < now) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = task.name.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

impl Task {
    /// Creates a new `Task` owned by `owner_id`.
    pub fn new(input: TaskInput, owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            priority: input.priority,
            status: input.status,
            deadline: input.deadline,
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the editable fields. Id, owner and creation time are kept.
    pub fn apply(&mut self, input: TaskInput) {
        self.name = input.name;
        self.description = input.description;
        self.priority = input.priority;
        self.status = input.status;
        self.deadline = input.deadline;
        self.updated_at = Utc::now();
    }
}
