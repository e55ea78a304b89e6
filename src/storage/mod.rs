//! Storage Module
//!
//! Flat-file persistence: one text file per database, one record per line.
//!
//! ## Responsibilities
//! - Open database files under advisory locks (shared to read, exclusive to write)
//! - Optional transparent gzip layer
//! - Sequential scans for queries
//! - Atomic update/delete through copy-filter-rename
//!
//! ## Replace Protocol
//! ```text
//!   primary (exclusive lock) ──scan──▶ temp sibling ──rename──▶ primary
//!                                 │
//!                     matching line rewritten or omitted
//! ```
//! Readers only ever see the old complete file or the new complete file.

mod database;
mod file;
mod mutation;
mod query;

pub use database::Database;
pub use file::{AccessMode, DbFile, Lines, LockMode, RecordWriter};
pub use mutation::Replacement;
