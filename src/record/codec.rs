//! Record codec
//!
//! `Value` ⇄ line-safe token, and the `key:token` line framing.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bincode::Options;

use crate::error::{LineKvError, Result};

use super::Value;

/// Separator between key and encoded value on a line
pub const SEPARATOR: char = ':';

/// Upper bound for a decoded record (guards against corrupt length prefixes)
const MAX_RECORD_SIZE: u64 = 64 * 1024 * 1024;

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_RECORD_SIZE)
}

// =============================================================================
// Value Encoding/Decoding
// =============================================================================

/// Encode a value to a token free of newlines and separators
pub fn encode(value: &Value) -> Result<String> {
    let bytes = bincode_options()
        .serialize(value)
        .map_err(|e| LineKvError::UnsupportedType(e.to_string()))?;

    Ok(STANDARD.encode(bytes))
}

/// Decode a token produced by `encode`
pub fn decode(token: &str) -> Result<Value> {
    let bytes = STANDARD.decode(token.trim_end()).map_err(|e| LineKvError::CorruptRecord {
        key: None,
        reason: format!("invalid base64: {}", e),
    })?;

    bincode_options()
        .deserialize(&bytes)
        .map_err(|e| LineKvError::CorruptRecord {
            key: None,
            reason: format!("invalid payload: {}", e),
        })
}

// =============================================================================
// Line Framing
// =============================================================================

/// Build a complete line, trailing newline included
pub fn format_line(key: &str, value: &Value) -> Result<String> {
    let token = encode(value)?;

    let mut line = String::with_capacity(key.len() + token.len() + 2);
    line.push_str(key);
    line.push(SEPARATOR);
    line.push_str(&token);
    line.push('\n');
    Ok(line)
}

/// A line split into key and still-encoded value, both as raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub key: &'a [u8],
    /// `None` when the line carries no separator at all
    pub token: Option<&'a [u8]>,
}

impl<'a> RawRecord<'a> {
    pub fn has_key(&self, key: &str) -> bool {
        self.key == key.as_bytes()
    }

    /// The key as text, with invalid UTF-8 replaced
    pub fn key(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.key)
    }

    /// Integer value of a numeric key
    ///
    /// Decimal and exponent forms (`1.5`, `2e3`) count, truncated toward zero.
    pub fn numeric_key(&self) -> Option<i64> {
        let text = std::str::from_utf8(self.key).ok()?;
        if let Ok(n) = text.parse::<i64>() {
            return Some(n);
        }

        // Must start like a number; rules out "inf" and "nan"
        if !text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return None;
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    }

    /// Decode the value, attaching the key to any error
    pub fn decode(&self) -> Result<Value> {
        let corrupt = |reason: String| LineKvError::CorruptRecord {
            key: Some(self.key().into_owned()),
            reason,
        };

        let token = self
            .token
            .ok_or_else(|| corrupt("missing separator".to_string()))?;
        let token = std::str::from_utf8(token)
            .map_err(|e| corrupt(format!("invalid UTF-8: {}", e)))?;

        decode(token).map_err(|e| match e {
            LineKvError::CorruptRecord { reason, .. } => corrupt(reason),
            other => other,
        })
    }
}

/// Split a line (with or without its trailing newline) at the first separator
pub fn split_line(line: &[u8]) -> RawRecord<'_> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);

    match line.iter().position(|&b| b == SEPARATOR as u8) {
        Some(at) => RawRecord {
            key: &line[..at],
            token: Some(&line[at + 1..]),
        },
        None => RawRecord { key: line, token: None },
    }
}
