//! Session store boundary.
//!
//! The host HTTP session exposes a byte-oriented key/value store scoped to a
//! single browser session. Everything the wizard persists goes through
//! [`SessionStore`]; nothing else in the core touches storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;

/// Key/value store scoped to one HTTP session.
///
/// Payload size is unbounded. Implementations must be consistent per key;
/// no read-modify-write is atomic across calls.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the raw payload stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Store `value` under `key`, replacing any previous payload.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}

/// Process-local session store backed by a `HashMap`.
///
/// Thread-safe via interior `RwLock`; the lock guards the map, not a flow's
/// load-then-save sequence.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySessionStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a payload exists under `key`.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
