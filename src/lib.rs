#![doc = "The `choreforge` library crate."]
#![doc = ""]
#![doc = "Credential hashing, session tokens and owner-scoped access control for a multi-tenant"]
#![doc = "task tracker, plus the storage collaborators, routes and error handling the binary"]
#![doc = "(`main.rs`) wires together."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

pub use crate::auth::{AccessAuthority, AccessDenied, Principal};
pub use crate::error::AppError;
