//! Cache Module
//!
//! In-memory cache of values returned by direct gets.
//!
//! ## Responsibilities
//! - Serve repeated gets of the same `database.key` without file I/O
//! - Stay within a fixed number of entries
//! - Drop entries eagerly when their record is updated or deleted
//!
//! ## Eviction
//! Entries leave in insertion order once the bound is exceeded. Reading
//! an entry does not move it, so this is deliberately not an LRU.

mod read_cache;

pub use read_cache::ReadCache;

/// Number of entries kept by the engine's read cache
pub const DEFAULT_CAPACITY: usize = 30;
