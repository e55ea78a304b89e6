//! Address parser
//!
//! Turns `database[.key][:action]` into its parts.

use crate::error::{LineKvError, Result};

use super::Action;

/// How an address names its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRef {
    /// `db.key`
    Explicit(String),

    /// Bare `db` with no action: the caller must synthesize `max + 1`
    Auto,

    /// `db:action` with no key segment
    Absent,
}

/// A parsed address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub database: String,
    pub key: KeyRef,
    pub action: Option<Action>,
}

impl Address {
    /// Parse an address string
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() || !input.chars().all(is_address_char) {
            return Err(LineKvError::InvalidAddress(input.to_string()));
        }

        let (target, action) = match input.split_once(':') {
            Some((target, "")) => (target, None),
            Some((target, action)) => (target, Some(action.parse::<Action>()?)),
            None => (input, None),
        };

        let (database, key) = match target.split_once('.') {
            Some((database, key)) => (database, KeyRef::Explicit(key.to_string())),
            None if action.is_none() => (target, KeyRef::Auto),
            None => (target, KeyRef::Absent),
        };

        if database.is_empty() {
            return Err(LineKvError::InvalidAddress(input.to_string()));
        }

        Ok(Self {
            database: database.to_string(),
            key,
            action,
        })
    }

    /// The explicit key, if any
    pub fn key(&self) -> Option<&str> {
        match &self.key {
            KeyRef::Explicit(key) => Some(key),
            KeyRef::Auto | KeyRef::Absent => None,
        }
    }
}

/// Characters permitted anywhere in an address
pub fn is_address_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':'
}

/// `database.key` as used for cache entries and error messages
pub fn qualified(database: &str, key: &str) -> String {
    format!("{}.{}", database, key)
}
