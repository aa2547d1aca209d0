//! Key-value text stores backing the nearby cache.
//!
//! # Invariants
//! - `set` replaces the whole value for a key atomically.
//! - `get` of an unknown key is `Ok(None)`, not an error.

use crate::db::DbError;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

pub type CacheStoreResult<T> = Result<T, CacheStoreError>;

#[derive(Debug)]
pub enum CacheStoreError {
    Db(DbError),
    /// In-process store guard was poisoned.
    LockPoisoned,
    /// Backend refused the operation.
    Unavailable(String),
}

impl Display for CacheStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "cache store lock is poisoned"),
            Self::Unavailable(message) => write!(f, "cache store unavailable: {message}"),
        }
    }
}

impl Error for CacheStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::LockPoisoned | Self::Unavailable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for CacheStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous flat key-value text store.
pub trait PersistedCacheStore {
    fn get(&self, key: &str) -> CacheStoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CacheStoreResult<()>;
}

impl<T: PersistedCacheStore + ?Sized> PersistedCacheStore for &T {
    fn get(&self, key: &str) -> CacheStoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> CacheStoreResult<()> {
        (**self).set(key, value)
    }
}

/// Process-local store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistedCacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> CacheStoreResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| CacheStoreError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CacheStoreResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| CacheStoreError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store over the `kv_store` table of a migrated connection.
pub struct SqliteCacheStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCacheStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PersistedCacheStore for SqliteCacheStore<'_> {
    fn get(&self, key: &str) -> CacheStoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> CacheStoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        debug!(
            "event=cache_store_set module=cache status=ok key={key} bytes={}",
            value.len()
        );
        Ok(())
    }
}
