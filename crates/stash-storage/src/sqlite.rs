//! SQLite-backed store
//!
//! Disk persistence for a storage area, the way browsers keep local storage
//! in a per-origin SQLite file.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::StorageError;
use crate::migrations::run_migrations;
use crate::store::{entry_size, KeyValueStore, DEFAULT_QUOTA_BYTES};
use crate::Result;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    quota: Option<usize>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            quota: Some(DEFAULT_QUOTA_BYTES),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            quota: Some(DEFAULT_QUOTA_BYTES),
        })
    }

    /// Replace the byte quota, `None` for unlimited
    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM items WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        let quota = self.quota;

        self.transaction(|conn| {
            if let Some(quota) = quota {
                let others: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
                     FROM items WHERE key != ?1",
                    [key],
                    |row| row.get(0),
                )?;
                let requested = others as usize + entry_size(key, value);
                if requested > quota {
                    tracing::debug!(key = %key, requested, quota, "Write rejected by quota");
                    return Err(StorageError::QuotaExceeded { requested, quota });
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO items (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> Result<Option<String>> {
        self.transaction(|conn| {
            let previous: Option<String> = conn
                .query_row("SELECT value FROM items WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            conn.execute("DELETE FROM items WHERE key = ?1", [key])?;
            Ok(previous)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM items", [])?;
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM items")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(keys)
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn usage_bytes(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let bytes: i64 = conn.query_row(
                "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
                 FROM items",
                [],
                |row| row.get(0),
            )?;
            Ok(bytes as usize)
        })
    }
}

impl Clone for SqliteStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            quota: self.quota,
        }
    }
}
