//! Record Module
//!
//! Value type and the line codec for database files.
//!
//! ## Line Format
//! ```text
//! ┌─────────┬───┬──────────────────────────────────┬────┐
//! │   Key   │ : │ base64(bincode(Value))           │ \n │
//! └─────────┴───┴──────────────────────────────────┴────┘
//! ```
//!
//! The key never contains `:` (the address grammar forbids it inside a
//! key segment) and the base64 alphabet contains neither `:` nor a newline,
//! so splitting a line at its first `:` is always unambiguous.

mod codec;
mod value;

pub use codec::{decode, encode, format_line, split_line, RawRecord, SEPARATOR};
pub use value::Value;
