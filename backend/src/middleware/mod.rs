//! HTTP middleware

pub mod auth;

pub use auth::{auth_middleware, check_permission, AuthUser, CurrentUser, INVENTORY_WRITE};
