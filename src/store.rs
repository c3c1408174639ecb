//! Key-value persistence backends.
//!
//! Raw bytes in and out; [`put_json`] and [`get_json`] layer serde on top.
//! The explorer keeps one record here, the active auth configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Path value that selects the in-memory backend instead of SQLite.
pub const MEMORY_STORE: &str = ":memory:";

pub trait KvStore {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

/// Serialize `value` as JSON under `key`.
pub fn put_json<S, T>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: KvStore + ?Sized,
    T: Serialize,
{
    validate_key(key)?;
    store.put(key, serde_json::to_vec(value)?)
}

/// Read and deserialize the JSON value under `key`, if any.
pub fn get_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    validate_key(key)?;
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.is_empty() || key.len() > 256 {
        return Err(invalid("must be 1..=256 chars"));
    }
    let ok = key.bytes().all(|b| {
        matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' | b'/' | b':')
    });
    if !ok {
        return Err(invalid("contains a character outside [A-Za-z0-9._-/:]"));
    }
    Ok(())
}

/// Open the backend selected by `path`: [`MEMORY_STORE`] or a SQLite file.
pub fn open(path: &str) -> Result<Box<dyn KvStore>, StoreError> {
    if path == MEMORY_STORE {
        return Ok(Box::new(MemoryKv::default()));
    }
    Ok(Box::new(SqliteKv::open(path)?))
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryKv {
    map: BTreeMap<String, Vec<u8>>,
}

impl KvStore for MemoryKv {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.map.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.map.remove(key);
        Ok(())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// SQLite backend: one `kv` table, upsert on write.
pub struct SqliteKv {
    path: PathBuf,
    conn: Connection,
}

impl SqliteKv {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { path, conn })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn now_unix() -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}

impl KvStore for SqliteKv {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.conn.execute(
            r#"INSERT INTO kv(key, value, updated_at)
               VALUES(?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            params![key, value, Self::now_unix()],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
