//! SQLite-backed document store.
//!
//! One row per item: (primary_key, secondary_key) and a JSON payload
//! column. Merges are read-merge-write inside a transaction, so a merge is
//! atomic per item; concurrent merges to the same identity still race at
//! last-write-wins granularity across processes.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use super::{DocumentStore, ItemKey, prepare_update};
use crate::error::StoreError;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Fully in-memory store; useful for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                primary_key TEXT NOT NULL,
                secondary_key TEXT NOT NULL DEFAULT '',
                item TEXT NOT NULL,
                PRIMARY KEY (primary_key, secondary_key)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DocumentStore for SqliteStore {
    fn merge(&self, key: &ItemKey, fields: Map<String, Value>) -> Result<(), StoreError> {
        let (primary, secondary) = key.parts();
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT item FROM documents WHERE primary_key = ?1 AND secondary_key = ?2",
                params![primary, secondary],
                |row| row.get(0),
            )
            .optional()?;

        let mut item: Map<String, Value> = match existing {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Backend(format!("corrupt item payload: {e}")))?,
            None => Map::new(),
        };

        for (field, value) in prepare_update(fields) {
            item.insert(field, value);
        }

        let payload = serde_json::to_string(&item)
            .map_err(|e| StoreError::Backend(format!("failed to encode item: {e}")))?;
        tx.execute(
            "INSERT OR REPLACE INTO documents (primary_key, secondary_key, item)
             VALUES (?1, ?2, ?3)",
            params![primary, secondary, payload],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, key: &ItemKey) -> Result<Value, StoreError> {
        let (primary, secondary) = key.parts();
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT item FROM documents WHERE primary_key = ?1 AND secondary_key = ?2",
                params![primary, secondary],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Backend(format!("corrupt item payload: {e}"))),
            None => Err(StoreError::NotFound),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}
