use crate::infrastructure::storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const USER_NAME_KEY: &str = "users-name";
pub const TASKS_KEY: &str = "kanban-tasks";
pub const COLUMNS_KEY: &str = "kanban-columns";
pub const WORK_TIMING_KEY: &str = "work-timing";
pub const LAST_NOTIFICATION_DATE_KEY: &str = "last-notification-date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub value: T,
    pub existed: bool,
}

#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> Loaded<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "no stored value, using default");
                return Loaded {
                    value: default,
                    existed: false,
                };
            }
            Err(err) => {
                warn!(key, error = %err, "failed to read stored value, using default");
                return Loaded {
                    value: default,
                    existed: false,
                };
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Loaded {
                value,
                existed: true,
            },
            Err(err) => {
                warn!(key, error = %err, "stored value is malformed, using default");
                Loaded {
                    value: default,
                    existed: false,
                }
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(key, error = %err, "failed to encode value, skipping save");
                return;
            }
        };
        if let Err(err) = self.backend.put(key, &encoded) {
            error!(key, error = %err, "failed to save value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{default_columns, Column, WorkTiming};
    use crate::infrastructure::error::AppError;
    use crate::infrastructure::storage::InMemoryKeyValueStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::InvalidConfig("read failure".to_string()))
        }

        fn put(&self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::InvalidConfig("quota exceeded".to_string()))
        }
    }

    fn in_memory() -> (Arc<InMemoryKeyValueStore>, StateStore) {
        let backend = Arc::new(InMemoryKeyValueStore::default());
        let store = StateStore::new(Arc::clone(&backend) as Arc<dyn KeyValueStore>);
        (backend, store)
    }

    #[test]
    fn missing_key_returns_default_not_existed() {
        let (_, store) = in_memory();
        let loaded = store.load(WORK_TIMING_KEY, WorkTiming::default());
        assert!(!loaded.existed);
        assert_eq!(loaded.value, WorkTiming::default());
    }

    #[test]
    fn saved_value_loads_back() {
        let (_, store) = in_memory();
        let timing = WorkTiming {
            start_time: "08:00".to_string(),
            end_time: "16:30".to_string(),
            work_days: vec![1, 3],
        };
        store.save(WORK_TIMING_KEY, &timing);

        let loaded = store.load(WORK_TIMING_KEY, WorkTiming::default());
        assert!(loaded.existed);
        assert_eq!(loaded.value, timing);
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let (backend, store) = in_memory();
        backend.put(COLUMNS_KEY, "{not json").expect("put raw");

        let loaded: Loaded<Vec<Column>> = store.load(COLUMNS_KEY, default_columns());
        assert!(!loaded.existed);
        assert_eq!(loaded.value, default_columns());
    }

    #[test]
    fn backend_failures_never_escape() {
        let store = StateStore::new(Arc::new(BrokenStore));
        store.save(USER_NAME_KEY, "Ada");
        let loaded = store.load(USER_NAME_KEY, String::new());
        assert!(!loaded.existed);
        assert!(loaded.value.is_empty());
    }

    #[test]
    fn wire_format_is_plain_json() {
        let (backend, store) = in_memory();
        store.save(LAST_NOTIFICATION_DATE_KEY, "2026-10-16");
        assert_eq!(
            backend.get(LAST_NOTIFICATION_DATE_KEY).expect("get").as_deref(),
            Some("\"2026-10-16\"")
        );
    }
}
