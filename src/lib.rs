// POS Ledger - Core Library
// Exposes the inventory ledger for the CLI, the API server, and tests

pub mod config;
pub mod error;
pub mod import;
pub mod ledger;
pub mod model;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{Config, StoreKind};
pub use error::{LedgerError, Result};
pub use import::{import_catalog, load_catalog_csv, read_catalog};
pub use ledger::{Ledger, MemoryLedger, SqliteLedger};
pub use model::{NewOrder, NewProduct, Order, OrderId, Product, ProductId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
