pub mod schema;

use crate::error::StoreError;
use crate::store::KvStore;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default location of the host database
pub fn get_database_path() -> PathBuf {
    PathBuf::from("./data/memo-sync.db")
}

/// SQLite backed [`KvStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and initialises) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Make sure the directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Backend(format!("create {:?}: {}", parent, e)))?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("connection lock poisoned".to_string()))?;
        Ok(f(&guard)?)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )
        })
        .map(|_| ())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| conn.execute("DELETE FROM kv_store WHERE key = ?1", [key]))
            .map(|_| ())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let keys = rows.collect::<rusqlite::Result<Vec<String>>>();
            keys
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite_remove() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.set("memos", "[{\"id\":1}]").unwrap();
        store.set("memos", "[{\"id\":2}]").unwrap();
        assert_eq!(store.get("memos").unwrap().as_deref(), Some("[{\"id\":2}]"));

        store.set("appSettings", "{}").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["appSettings", "memos"]);

        store.remove("memos").unwrap();
        assert_eq!(store.get("memos").unwrap(), None);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memo-sync.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("lastSyncTime", "2025-01-01T00:00:00Z").unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("lastSyncTime").unwrap().as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
    }
}
