// Bull Registry - Core Library
// Exposes the record store, importer and web surface for the CLI, API server, and tests

pub mod bull;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod sheet;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use bull::{Bull, BullAttributes, ValidationErrors};
pub use config::Config;
pub use db::{setup_database, BullStore, SqliteBullStore};
pub use error::{StoreError, StoreResult};
pub use import::{ImportError, ImportPolicy, ImportReport, Importer, RowError, SkippedRow};
pub use sheet::{detect_format, get_reader, read_sheet, Cell, Sheet, SheetFormat, SheetReader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
