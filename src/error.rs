//! Error types for LineKV
//!
//! Provides a unified error type for all operations. The `Display` text of
//! each variant is exactly what gets appended to the engine's error log.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using LineKvError
pub type Result<T> = std::result::Result<T, LineKvError>;

/// Unified error type for LineKV operations
#[derive(Debug, Error)]
pub enum LineKvError {
    // -------------------------------------------------------------------------
    // Address Errors
    // -------------------------------------------------------------------------
    #[error("Invalid address \"{0}\" (allowed characters: a-zA-Z0-9_.:)")]
    InvalidAddress(String),

    #[error("Invalid action \"{0}\" (unknown action)")]
    UnknownAction(String),

    // -------------------------------------------------------------------------
    // Database Errors
    // -------------------------------------------------------------------------
    #[error("Database \"{0}\" has not been created (register it in the create set)")]
    DatabaseNotRegistered(String),

    #[error("Failed to {op} \"{}\": {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Key \"{0}\" already exists in database")]
    KeyAlreadyExists(String),

    #[error("Key \"{0}\" does not exist")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported value: {0}")]
    UnsupportedType(String),

    #[error(
        "Corrupt record{}: {reason}",
        .key.as_ref().map(|k| format!(" for key \"{}\"", k)).unwrap_or_default()
    )]
    CorruptRecord { key: Option<String>, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LineKvError {
    /// Build a mapper that tags an `io::Error` with the operation and path
    ///
    /// ```ignore
    /// File::open(&path).map_err(LineKvError::io("open", &path))?;
    /// ```
    pub fn io(op: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| LineKvError::Io { op, path, source }
    }

    /// True for the "no such key" failure (used by callers that treat it as a miss)
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, LineKvError::KeyNotFound(_))
    }
}
