/// SQLite implementation of the key-value backend
///
/// Documents are stored as JSON text in a single `kv` table. A tiny
/// version table tracks the physical schema so future table changes can
/// migrate in place; note this is distinct from the logical document
/// generations handled in `migrate`.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::storage::{KeyValueBackend, StorageError};

/// Current physical schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed key-value store
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open (or create) the database file and ensure the schema exists
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        initialize_schema(&conn)?;
        tracing::info!("SQLite key-value store initialized at: {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, useful for tests
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn initialize_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    if current < SCHEMA_VERSION {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        tracing::info!("Applied kv schema v{}", SCHEMA_VERSION);
    }

    Ok(())
}

#[async_trait]
impl KeyValueBackend for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let text: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(&value)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, text],
        )?;
        Ok(())
    }
}
