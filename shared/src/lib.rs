//! Shared domain logic for the gym console inventory ledger
//!
//! This crate holds everything that must behave identically on the server
//! and in the browser (via WASM): quantity rules, movement planning,
//! alert classification and input validation. It performs no I/O.

pub mod models;
pub mod quantity;
pub mod types;
pub mod validation;

pub use models::*;
pub use quantity::*;
pub use types::*;
pub use validation::*;
