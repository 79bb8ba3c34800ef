//! Transactional key-value storage
//!
//! Both stores sit on top of a single-table SQLite file:
//! - key:   TEXT primary key
//! - value: BLOB (JSON for structured records)
//!
//! All access goes through a transaction scope. `view` opens a read-only
//! transaction, `update` a read-write one whose writes commit together when
//! the closure returns `Ok` and are rolled back when it returns `Err`.

use rusqlite::{ffi, params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// How long a writer waits on another process holding the file lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Embedded key-value store backed by one SQLite file
pub struct KvStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl KvStore {
    /// Open or create the store at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            ) WITHOUT ROWID;
            "#,
        )?;

        info!(path = %path.display(), "opened store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let txn = Txn {
            tx: conn.transaction_with_behavior(TransactionBehavior::Deferred)?,
            writable: false,
        };

        let value = f(&txn)?;
        txn.tx.commit()?;
        Ok(value)
    }

    /// Run `f` inside a read-write transaction.
    ///
    /// The transaction takes the write lock up front, so two read-modify-write
    /// operations never interleave.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let txn = Txn {
            tx: conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
            writable: true,
        };

        // Dropping an uncommitted transaction rolls it back
        let value = f(&txn)?;
        txn.tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic inside a closure leaves the connection usable: the
        // transaction it held was rolled back on unwind.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An open transaction on a [`KvStore`]
pub struct Txn<'a> {
    tx: Transaction<'a>,
    writable: bool,
}

impl Txn<'_> {
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_writable("set")?;
        self.tx.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        debug!(key, bytes = value.len(), "set");
        Ok(())
    }

    /// Delete `key`, returning whether it existed
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_writable("delete")?;
        let removed = self.tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        debug!(key, removed, "delete");
        Ok(removed > 0)
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        let found: Option<i64> = self
            .tx
            .query_row("SELECT 1 FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Every record, in key order
    pub fn scan(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut stmt = self.tx.prepare("SELECT key, value FROM kv ORDER BY key")?;
        let records = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Read and deserialize a JSON record
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize and write a JSON record
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes)
    }

    fn ensure_writable(&self, op: &str) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::Storage(rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_READONLY),
                Some(format!("{} is not allowed in a read-only transaction", op)),
            )))
        }
    }
}
