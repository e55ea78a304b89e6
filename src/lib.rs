//! # LineKV
//!
//! A minimal flat-file key/value store with:
//! - One text file per database, one record per line
//! - Compound `database.key` addressing with `:action` suffixes
//! - Atomic update/delete through copy-filter-rename
//! - Auto-increment keys, optional gzip, advisory file locks
//! - A small insertion-ordered read cache
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │        (config · lifecycle · error log · error policy)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Address::parse
//!          ┌────────────┼──────────────────────┐
//!          │            │                      │
//!          ▼            ▼                      ▼
//!   ┌─────────────┐ ┌─────────────┐    ┌──────────────┐
//!   │  ReadCache  │ │   Queries   │    │  Mutations   │
//!   │ (30 items)  │ │ (shared lk) │    │ (excl. lock) │
//!   └─────────────┘ └──────┬──────┘    └──────┬───────┘
//!                          │                  │
//!                          ▼                  ▼
//!                   ┌──────────────────────────────┐
//!                   │   DbFile (+gzip) · Record    │
//!                   │   codec (bincode + base64)   │
//!                   └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use linekv::{Config, Engine};
//!
//! let config = Config::builder()
//!     .path("./cache")
//!     .database("default")
//!     .build();
//! let engine = Engine::new(config);
//!
//! engine.set("default", "1", "test value")?;
//! let key = engine.insert("default", "another test value")?; // "2"
//! assert_eq!(key, "2");
//!
//! let value = engine.get("default", "1")?;
//! assert_eq!(value.as_str(), Some("test value"));
//! # Ok::<(), linekv::LineKvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod protocol;
pub mod storage;
pub mod cache;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LineKvError, Result};
pub use config::{Config, Options};
pub use engine::Engine;
pub use protocol::{Action, Address, Reply, Window};
pub use record::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LineKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
