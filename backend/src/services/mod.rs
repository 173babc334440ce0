//! Business logic services for the inventory ledger

pub mod alert;
pub mod ledger;
pub mod locks;
pub mod movement;
pub mod product;
pub mod reporting;

pub use alert::AlertService;
pub use ledger::{
    InMemoryLedgerStore, LedgerStore, MovementLedger, PgLedgerStore, ReconciliationReport,
    StockReading, StockSource,
};
pub use locks::ProductLocks;
pub use movement::MovementService;
pub use product::ProductService;
pub use reporting::ReportingService;
