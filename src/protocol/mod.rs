//! Protocol Module
//!
//! The addressing grammar callers use to reach records and actions.
//!
//! ## Address Format
//! ```text
//! ┌────────────┬─────────────────┬───────────────────┐
//! │  database  │  [ '.' key ]    │  [ ':' action ]   │
//! └────────────┴─────────────────┴───────────────────┘
//! ```
//!
//! Allowed characters: `a-zA-Z0-9_.:`
//!
//! ### Forms
//! - `db.key`        - get (or insert, when a value is given)
//! - `db`            - insert under the next auto-increment key
//! - `db:action`     - database-wide action
//! - `db.key:action` - keyed action (`key`, `update`, `delete`)
//!
//! ### Actions
//! `count`, `delete`, `drop`, `error`, `errors`, `key`, `keys`, `max`,
//! `select`, `update`

mod action;
mod address;
mod reply;

pub use action::{Action, Window};
pub use address::{is_address_char, qualified, Address, KeyRef};
pub use reply::Reply;
