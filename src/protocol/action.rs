//! Action definitions
//!
//! The closed set of named operations reachable through `db[.key]:action`.

use std::fmt;
use std::str::FromStr;

use crate::error::LineKvError;
use crate::record::Value;

/// A named query or mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Count,
    Delete,
    Drop,
    Error,
    Errors,
    Key,
    Keys,
    Max,
    Select,
    Update,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Count,
        Action::Delete,
        Action::Drop,
        Action::Error,
        Action::Errors,
        Action::Key,
        Action::Keys,
        Action::Max,
        Action::Select,
        Action::Update,
    ];

    /// Name as written in an address
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Count => "count",
            Action::Delete => "delete",
            Action::Drop => "drop",
            Action::Error => "error",
            Action::Errors => "errors",
            Action::Key => "key",
            Action::Keys => "keys",
            Action::Max => "max",
            Action::Select => "select",
            Action::Update => "update",
        }
    }
}

impl FromStr for Action {
    type Err = LineKvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| LineKvError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Select Window
// =============================================================================

/// Positional window for `select`: skip `offset` lines, return up to `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    pub fn limit(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Read a window from a `[limit]` or `[offset, limit]` list
    ///
    /// Numbers are truncated to integers and negatives clamp to zero; any
    /// other element counts as zero. A value that is not a list, or an empty
    /// list, gives a zero-length window.
    pub fn from_value(value: &Value) -> Self {
        let count = |v: &Value| {
            let n = v
                .as_int()
                .or_else(|| v.as_float().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0);
            usize::try_from(n.max(0)).unwrap_or(usize::MAX)
        };

        match value.as_list() {
            Some([limit]) => Self::limit(count(limit)),
            Some([offset, limit, ..]) => Self::new(count(offset), count(limit)),
            Some([]) | None => Self::limit(0),
        }
    }

    /// Whether scan position `i` falls inside the window, given `taken` rows so far
    pub fn admits(&self, i: usize, taken: usize) -> bool {
        i >= self.offset && taken < self.limit
    }
}
