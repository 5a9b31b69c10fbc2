//! Core type definitions for fsak

mod entry;
mod error;

pub(crate) use entry::file_name_of;
pub use entry::{CatalogEntry, EntryStatus, Fingerprint};
pub use error::FsakError;
