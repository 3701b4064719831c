//! Session types and the store contract the CAS core runs against.
//!
//! Sessions and single-logout ticket bindings live in one fallible key/value
//! store with per-entry expiry.

pub mod store;
pub mod types;

pub use store::{MemorySessionStore, SessionStore};
pub use types::{Session, StoreEntry, TicketSessionBinding};
