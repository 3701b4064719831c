//! Session and ticket binding types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A user session as seen by the CAS core: a store key plus named slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Store key of this session.
    pub key: String,

    /// Session creation time.
    pub created_at: DateTime<Utc>,

    /// Named slots (identity, attributes, return URL, ...).
    #[serde(default)]
    pub slots: HashMap<String, Value>,
}

impl Session {
    /// Create an empty session under a fresh random key.
    pub fn new() -> Self {
        Self::with_key(hex::encode(rand::random::<[u8; 16]>()))
    }

    /// Create an empty session under a caller-provided store key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            created_at: Utc::now(),
            slots: HashMap::new(),
        }
    }

    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    /// Get a slot holding a string.
    pub fn get_str(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).and_then(Value::as_str)
    }

    pub fn set(&mut self, slot: impl Into<String>, value: Value) {
        self.slots.insert(slot.into(), value);
    }

    pub fn remove(&mut self, slot: &str) -> Option<Value> {
        self.slots.remove(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a service ticket to the session it created, for single logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSessionBinding {
    pub ticket: String,
    pub session_key: String,
}

/// A value held by a [`SessionStore`](super::SessionStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreEntry {
    Session(Session),
    Binding(TicketSessionBinding),
}
