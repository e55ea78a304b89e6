//! Mutations
//!
//! Inserts append a line under the primary file's exclusive lock. Updates
//! and deletes rewrite the file into a temp sibling and rename it over the
//! primary, still under that lock, so a partial file is never visible and
//! concurrent writers apply one after the other.

use std::fs;

use crate::error::{LineKvError, Result};
use crate::record::{format_line, split_line, Value};

use super::{AccessMode, Database, DbFile};

/// What happens to the matching line during a replace
#[derive(Debug, Clone, Copy)]
pub enum Replacement<'a> {
    /// Write this value instead
    Update(&'a Value),

    /// Omit the line
    Delete,
}

impl Replacement<'_> {
    fn verb(&self) -> &'static str {
        match self {
            Replacement::Update(_) => "update",
            Replacement::Delete => "delete",
        }
    }
}

impl Database {
    /// Insert a new record
    ///
    /// With `key = None` the key is one more than the current greatest
    /// integer key. Existence check and append happen under one exclusive
    /// lock, so two inserts of the same key cannot both succeed.
    pub fn insert(&self, key: Option<&str>, value: &Value) -> Result<String> {
        let mut file = self.open(AccessMode::Append)?;

        let mut exists = false;
        let mut max = 0i64;
        for line in file.lines()? {
            let line = line?;
            let record = split_line(&line);
            match key {
                Some(key) if record.has_key(key) => {
                    exists = true;
                    break;
                }
                Some(_) => {}
                None => {
                    if let Some(n) = record.numeric_key() {
                        max = max.max(n);
                    }
                }
            }
        }

        let key = match key {
            Some(key) => key.to_string(),
            None => max.saturating_add(1).to_string(),
        };

        if exists {
            return Err(LineKvError::KeyAlreadyExists(self.qualify(&key)));
        }

        file.append(&format_line(&key, value)?)?;
        tracing::debug!("Inserted \"{}\"", self.qualify(&key));

        Ok(key)
    }

    /// Rewrite every line stored under `key` via temp file and rename
    ///
    /// Fails with `KeyNotFound` (leaving the primary file untouched) when no
    /// line matches. A temp file left over by an earlier failed rename is
    /// reclaimed: every writer holds the primary's exclusive lock, so no live
    /// operation can own it.
    pub fn replace(&self, key: &str, replacement: Replacement<'_>) -> Result<()> {
        let mut source = self.open(AccessMode::Append)?;

        if self.tmp_path().exists() {
            tracing::warn!(
                "Reclaiming abandoned temp file {}",
                self.tmp_path().display()
            );
        }
        let mut temp = DbFile::open(self.tmp_path(), AccessMode::Create, self.is_compressed())?;

        let replaced = match self.copy_filtered(&mut source, &mut temp, key, replacement) {
            Ok(replaced) => replaced,
            Err(e) => {
                drop(temp);
                self.discard_temp();
                return Err(e);
            }
        };
        drop(temp);

        if !replaced {
            fs::remove_file(self.tmp_path())
                .map_err(LineKvError::io("remove temp database", self.tmp_path()))?;
            return Err(LineKvError::KeyNotFound(self.qualify(key)));
        }

        // Sole visibility boundary; the primary's lock is still held here
        fs::rename(self.tmp_path(), self.path())
            .map_err(LineKvError::io("move temp database over", self.path()))?;
        drop(source);

        tracing::debug!("Replaced \"{}\" ({})", self.qualify(key), replacement.verb());
        Ok(())
    }

    fn copy_filtered(
        &self,
        source: &mut DbFile,
        temp: &mut DbFile,
        key: &str,
        replacement: Replacement<'_>,
    ) -> Result<bool> {
        let new_line = match replacement {
            Replacement::Update(value) => Some(format_line(key, value)?),
            Replacement::Delete => None,
        };

        let mut replaced = false;
        let mut writer = temp.writer()?;

        for line in source.lines()? {
            let line = line?;
            if !split_line(&line).has_key(key) {
                writer.write_line(&line)?;
                continue;
            }

            replaced = true;
            if let Some(new_line) = &new_line {
                writer.write_line(new_line)?;
            }
        }

        writer.finish()?;
        temp.sync()?;
        Ok(replaced)
    }

    fn discard_temp(&self) {
        if let Err(e) = fs::remove_file(self.tmp_path()) {
            tracing::warn!(
                "Could not remove temp file {}: {}",
                self.tmp_path().display(),
                e
            );
        }
    }

    /// Delete the database file outright
    pub fn drop_file(&self) -> Result<()> {
        let held = self.open(AccessMode::Append)?;

        fs::remove_file(self.path()).map_err(LineKvError::io("drop database", self.path()))?;
        if self.tmp_path().exists() {
            self.discard_temp();
        }
        drop(held);

        tracing::info!("Dropped database \"{}\"", self.name());
        Ok(())
    }
}
