/// Persistence layer
///
/// The stores persist whole JSON documents through an asynchronous
/// key-value backend. The backend is deliberately dumb: get and set by
/// key, best-effort, no transactions across keys. Schema-generation
/// upgrades of the documents themselves live in `migrate`.

pub mod migrate;
pub mod sqlite;

pub use sqlite::SqliteKv;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Storage key for the goal-mode store document
pub const NEGATIVE_KEY: &str = "habits:negative:v1";
/// Storage key for the current-generation freeform store document
pub const POSITIVE_KEY_V2: &str = "habits:positive:v2";
/// Legacy freeform key, consulted only as a migration fallback
pub const POSITIVE_KEY_V1: &str = "habits:positive:v1";

/// Errors that can occur in the persistence backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Asynchronous key-value persistence backend
///
/// Implementations may fail; callers on the save path swallow errors
/// (durability is best-effort by design) and callers on the load path
/// fall back to an empty document.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct peek for test assertions
    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}
