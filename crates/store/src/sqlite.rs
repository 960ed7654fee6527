//! Single-file SQLite backend. Every collection shares one table; bodies are JSON.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::error::StoreError;
use crate::repository::{Record, Repository};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    body TEXT NOT NULL,       -- serde_json encoding of the record
    PRIMARY KEY (collection, key)
);
"#;

pub struct SqliteRepository<T> {
    conn: Mutex<Connection>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> SqliteRepository<T> {
    /// Open (creating if needed) the store file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        debug!("opened store {} for collection '{}'", path.display(), T::COLLECTION);
        Self::from_connection(conn)
    }

    /// Open a store file that must already exist. Never creates the file or
    /// its parent directories.
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("opened existing store {} for collection '{}'", path.display(), T::COLLECTION);
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            _marker: PhantomData,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn encode(record: &T) -> Result<String, StoreError> {
        serde_json::to_string(record).map_err(|e| StoreError::Serialize(e.to_string()))
    }

    fn decode(key: &str, body: &str) -> Result<T, StoreError> {
        serde_json::from_str(body).map_err(|e| StoreError::Deserialize {
            collection: T::COLLECTION.into(),
            key: key.into(),
            message: e.to_string(),
        })
    }
}

const UPSERT: &str = "INSERT INTO records (collection, key, body) VALUES (?1, ?2, ?3)
     ON CONFLICT(collection, key) DO UPDATE SET body = excluded.body";

impl<T: Record> Repository<T> for SqliteRepository<T> {
    fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        let conn = self.conn();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE collection = ?1 AND key = ?2",
                params![T::COLLECTION, key],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| Self::decode(key, &b)).transpose()
    }

    fn put(&self, record: &T) -> Result<(), StoreError> {
        let body = Self::encode(record)?;
        self.conn()
            .execute(UPSERT, params![T::COLLECTION, record.key(), body])?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let n = self.conn().execute(
            "DELETE FROM records WHERE collection = ?1 AND key = ?2",
            params![T::COLLECTION, key],
        )?;
        Ok(n > 0)
    }

    fn list(&self) -> Result<Vec<T>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT key, body FROM records WHERE collection = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![T::COLLECTION], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (key, body) = row?;
            out.push(Self::decode(&key, &body)?);
        }
        Ok(out)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![T::COLLECTION],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// All-or-nothing bulk upsert.
    fn put_all(&self, records: &[T]) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT)?;
            for r in records {
                let body = Self::encode(r)?;
                stmt.execute(params![T::COLLECTION, r.key(), body])?;
            }
        }
        tx.commit()?;
        debug!("stored {} record(s) in '{}'", records.len(), T::COLLECTION);
        Ok(())
    }

    /// Clears the collection and writes `records` in one transaction.
    fn replace_all(&self, records: &[T]) -> Result<usize, StoreError> {
        let incoming: HashSet<String> = records.iter().map(|r| r.key()).collect();
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut removed = 0usize;
        {
            let mut keys = tx.prepare("SELECT key FROM records WHERE collection = ?1")?;
            let rows = keys.query_map(params![T::COLLECTION], |row| row.get::<_, String>(0))?;
            for key in rows {
                if !incoming.contains(&key?) {
                    removed += 1;
                }
            }
        }
        tx.execute("DELETE FROM records WHERE collection = ?1", params![T::COLLECTION])?;
        {
            let mut stmt = tx.prepare(UPSERT)?;
            for r in records {
                let body = Self::encode(r)?;
                stmt.execute(params![T::COLLECTION, r.key(), body])?;
            }
        }
        tx.commit()?;
        debug!(
            "replaced '{}' with {} record(s), {} removed",
            T::COLLECTION,
            records.len(),
            removed
        );
        Ok(removed)
    }
}
