//! Domain models for the inventory ledger

mod alert;
mod movement;
mod product;

pub use alert::*;
pub use movement::*;
pub use product::*;
