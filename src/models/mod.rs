pub mod identity;
pub mod task;

pub use identity::{normalize_email, Identity};
pub use task::{Task, TaskInput, TaskPriority, TaskQuery, TaskSort, TaskStatus};
