//! SQLite-backed key-value operations.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult, KeyValueStore};

impl Database {
    /// Read a stored value.
    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    /// Insert or replace a stored value.
    pub fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a stored value. Returns whether a row was removed.
    pub fn remove_value(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}

/// Thread-safe [`KeyValueStore`] over a SQLite [`Database`].
pub struct PersistentStore {
    db: Mutex<Database>,
}

impl PersistentStore {
    /// Open (or create) a store backed by a file.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open a store that lives only as long as the process.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl KeyValueStore for PersistentStore {
    fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.db.lock()?.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.db.lock()?.set_value(key, value)
    }

    fn remove(&self, key: &str) -> DbResult<()> {
        self.db.lock()?.remove_value(key)?;
        Ok(())
    }
}
