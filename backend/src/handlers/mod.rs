//! HTTP request handlers

mod health;
mod inventory;
mod products;

pub use health::*;
pub use inventory::*;
pub use products::*;
