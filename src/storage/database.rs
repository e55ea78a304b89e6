//! Database handle
//!
//! Names the files backing one database and opens them.

use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{AccessMode, DbFile};

/// One database: a primary file plus, only during a replace, a temp sibling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    name: String,
    path: PathBuf,
    tmp_path: PathBuf,
    compressed: bool,
}

impl Database {
    /// Describe the database `name` stored under `root`
    ///
    /// Primary file: `{root}/{name}{ext}[.gz]`
    /// Temp file:    `{primary}.tmp{ext}[.gz]`
    pub fn new(root: &Path, name: &str, ext: &str, compressed: bool) -> Self {
        let suffix = if compressed { ".gz" } else { "" };
        let file_name = format!("{}{}{}", name, ext, suffix);
        let tmp_name = format!("{}.tmp{}{}", file_name, ext, suffix);

        Self {
            name: name.to_string(),
            path: root.join(file_name),
            tmp_path: root.join(tmp_name),
            compressed,
        }
    }

    /// Create the primary file (empty) if it is missing
    ///
    /// Returns true if it was created by this call.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.is_file() {
            return Ok(false);
        }

        let created = DbFile::create_empty(&self.path)?;
        if created {
            tracing::info!("Created database \"{}\" at {}", self.name, self.path.display());
        }
        Ok(created)
    }

    /// Open the primary file
    pub fn open(&self, mode: AccessMode) -> Result<DbFile> {
        DbFile::open(&self.path, mode, self.compressed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// `database.key`
    pub fn qualify(&self, key: &str) -> String {
        crate::protocol::qualified(&self.name, key)
    }
}
