use crate::infrastructure::error::AppError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), AppError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn put(&self, key: &str, value: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, AppError> {
        Connection::open(&self.db_path).map_err(AppError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let values = self
            .values
            .lock()
            .map_err(|error| AppError::LockPoisoned(format!("key/value store: {error}")))?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut values = self
            .values
            .lock()
            .map_err(|error| AppError::LockPoisoned(format!("key/value store: {error}")))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "kanban-storage-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let path = dir.join("kanban.sqlite");
            initialize_database(&path).expect("initialize database");
            Self { dir, path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn sqlite_store_upserts_values() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::new(&database.path);

        assert_eq!(store.get("users-name").expect("get"), None);
        store.put("users-name", "\"Ada\"").expect("put");
        store.put("users-name", "\"Grace\"").expect("overwrite");
        assert_eq!(store.get("users-name").expect("get").as_deref(), Some("\"Grace\""));
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let database = TempDatabase::new();
        SqliteKeyValueStore::new(&database.path)
            .put("work-timing", "{}")
            .expect("put");
        initialize_database(&database.path).expect("schema is idempotent");

        let reopened = SqliteKeyValueStore::new(&database.path);
        assert_eq!(reopened.get("work-timing").expect("get").as_deref(), Some("{}"));
    }

    #[test]
    fn in_memory_store_roundtrip() {
        let store = InMemoryKeyValueStore::default();
        store.put("k", "1").expect("put");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("1"));
        assert_eq!(store.get("other").expect("get"), None);
    }
}
