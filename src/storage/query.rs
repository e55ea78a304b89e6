//! Read-only scans
//!
//! Every query opens the primary file with a shared lock, streams its
//! lines once and releases the lock when done.

use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::error::{LineKvError, Result};
use crate::protocol::Window;
use crate::record::{split_line, RawRecord, Value};

use super::{AccessMode, Database};

impl Database {
    /// Visit every line in order until `visit` breaks
    pub(crate) fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, RawRecord<'_>) -> Result<ControlFlow<()>>,
    {
        let mut file = self.open(AccessMode::Read)?;

        for (i, line) in file.lines()?.enumerate() {
            let line = line?;
            if visit(i, split_line(&line))?.is_break() {
                break;
            }
        }

        Ok(())
    }

    /// Number of records
    pub fn count(&self) -> Result<u64> {
        let mut count = 0;
        self.scan(|_, _| {
            count += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(count)
    }

    /// Whether a record with exactly this key exists
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        let mut found = false;
        self.scan(|_, record| {
            if record.has_key(key) {
                found = true;
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(found)
    }

    /// All keys in on-disk order
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        self.scan(|_, record| {
            keys.push(record.key().into_owned());
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(keys)
    }

    /// Greatest numeric key (truncated to an integer), or 0 when there is none
    pub fn max_key(&self) -> Result<i64> {
        let mut max = 0i64;
        self.scan(|_, record| {
            if let Some(n) = record.numeric_key() {
                max = max.max(n);
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(max)
    }

    /// Decode the first record stored under `key`
    pub fn find(&self, key: &str) -> Result<Option<Value>> {
        let mut value = None;
        self.scan(|_, record| {
            if record.has_key(key) {
                value = Some(record.decode()?);
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(value)
    }

    /// Decode records in scan order, optionally restricted to a positional window
    ///
    /// The window counts line positions, not matches. A key appearing twice
    /// keeps its first position and its last value.
    pub fn select(&self, window: Option<Window>) -> Result<Vec<(String, Value)>> {
        let mut records: Vec<(String, Value)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut taken = 0;

        self.scan(|i, record| {
            if let Some(window) = window {
                if taken >= window.limit {
                    return Ok(ControlFlow::Break(()));
                }
                if !window.admits(i, taken) {
                    return Ok(ControlFlow::Continue(()));
                }
            }

            let value = record.decode()?;
            taken += 1;

            let key = record.key();
            match positions.get(&*key) {
                Some(&at) => records[at].1 = value,
                None => {
                    positions.insert(key.to_string(), records.len());
                    records.push((key.into_owned(), value));
                }
            }
            Ok(ControlFlow::Continue(()))
        })?;

        Ok(records)
    }

    /// Decode the record under `key`, failing if it is absent
    pub fn get(&self, key: &str) -> Result<Value> {
        self.find(key)?
            .ok_or_else(|| LineKvError::KeyNotFound(self.qualify(key)))
    }
}
