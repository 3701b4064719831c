//! Session store contract.
//!
//! The CAS core only needs a fallible key/value store with per-entry expiry.
//! Hosts plug in their own storage behind [`SessionStore`];
//! [`MemorySessionStore`] is the process-local implementation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::types::{Session, StoreEntry, TicketSessionBinding};

/// Fallible key/value store holding sessions and ticket bindings.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live entry. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<StoreEntry>>;

    /// Insert or replace an entry that expires after `ttl_secs`.
    async fn set(&self, key: &str, entry: StoreEntry, ttl_secs: u64) -> Result<()>;

    /// Remove an entry. Removing a missing key is not an error.
    async fn destroy(&self, key: &str) -> Result<()>;

    /// Fetch a session, ignoring entries of other kinds.
    async fn get_session(&self, key: &str) -> Result<Option<Session>> {
        match self.get(key).await? {
            Some(StoreEntry::Session(session)) => Ok(Some(session)),
            _ => Ok(None),
        }
    }

    async fn save_session(&self, session: &Session, ttl_secs: u64) -> Result<()> {
        self.set(&session.key, StoreEntry::Session(session.clone()), ttl_secs)
            .await
    }

    /// Fetch the binding stored under a ticket, ignoring entries of other kinds.
    async fn get_binding(&self, ticket: &str) -> Result<Option<TicketSessionBinding>> {
        match self.get(ticket).await? {
            Some(StoreEntry::Binding(binding)) => Ok(Some(binding)),
            _ => Ok(None),
        }
    }
}

/// Stored form of an entry.
#[derive(Debug, Clone)]
struct Record {
    entry: StoreEntry,
    expires_at: DateTime<Utc>,
}

impl Record {
    fn new(entry: StoreEntry, ttl_secs: u64) -> Result<Self> {
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| anyhow!("Entry TTL out of range: {}s", ttl_secs))?;
        Ok(Self { entry, expires_at })
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Record>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.get(key).is_some_and(|r| !r.is_expired()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<StoreEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("Store lock poisoned"))?;
        Ok(entries
            .get(key)
            .filter(|r| !r.is_expired())
            .map(|r| r.entry.clone()))
    }

    async fn set(&self, key: &str, entry: StoreEntry, ttl_secs: u64) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("Store lock poisoned"))?;
        entries.insert(key.to_string(), Record::new(entry, ttl_secs)?);
        Ok(())
    }

    async fn destroy(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("Store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
