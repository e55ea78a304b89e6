//! Reply definitions
//!
//! What a call through `Engine::call` hands back.

use std::fmt;

use crate::record::Value;

/// Result of a successful call, or the `Failed` sentinel
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Value read by a direct get
    Value(Value),

    /// Key written by a direct set (literal or auto-generated)
    Key(String),

    /// `key` action
    Bool(bool),

    /// `count` and `max`
    Number(i64),

    /// `keys`
    Keys(Vec<String>),

    /// `select`, in scan order
    Records(Vec<(String, Value)>),

    /// `error`
    LastError(Option<String>),

    /// `errors`
    Errors(Vec<String>),

    /// `update`, `delete`, `drop`
    Done,

    /// The call failed and errors are not raised; see `error`/`errors`
    Failed,
}

impl Reply {
    pub fn is_failed(&self) -> bool {
        matches!(self, Reply::Failed)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(value) => write!(f, "{}", value),
            Reply::Key(key) => write!(f, "{}", key),
            Reply::Bool(b) => write!(f, "{}", b),
            Reply::Number(n) => write!(f, "{}", n),
            Reply::Keys(keys) => write!(f, "{}", keys.join("\n")),
            Reply::Records(records) => {
                for (i, (key, value)) in records.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                Ok(())
            }
            Reply::LastError(Some(message)) => write!(f, "{}", message),
            Reply::LastError(None) => Ok(()),
            Reply::Errors(messages) => write!(f, "{}", messages.join("\n")),
            Reply::Done => write!(f, "true"),
            Reply::Failed => write!(f, "false"),
        }
    }
}
