//! # fsak - file catalog and cleanup toolkit
//!
//! Keeps a content-addressed catalog of files (MD5 + BLAKE3 from a single
//! read) and builds three operations on it: incremental catalog sync,
//! duplicate removal, and merging directory trees by content rather than
//! by name.

// Module declarations
pub mod catalog;
pub mod clean;
pub mod commands;
pub mod config;
pub mod dedupe;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use catalog::{CatalogStore, MemoryCatalog, SqliteCatalog};
pub use types::{CatalogEntry, EntryStatus, Fingerprint, FsakError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
