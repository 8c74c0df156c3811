// src/kv.rs
use crate::db::Error as DbError;
use std::collections::HashMap;

pub const EXERCISES_KEY: &str = "exercises";
pub const HAS_LAUNCHED_KEY: &str = "hasLaunched";
pub const HAS_COMPLETED_DATA_KEY: &str = "hasCompletedData";

/// String key-value persistence used by the store and the session flags.
/// Each call is a single atomic write from the caller's point of view.
pub trait KeyValueStore {
    /// # Errors
    /// Backend failure.
    fn get(&self, key: &str) -> Result<Option<String>, DbError>;
    /// # Errors
    /// Backend failure.
    fn set(&mut self, key: &str, value: &str) -> Result<(), DbError>;
    /// # Errors
    /// Backend failure.
    fn remove(&mut self, key: &str) -> Result<(), DbError>;
    /// # Errors
    /// Backend failure.
    fn clear(&mut self) -> Result<(), DbError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    entries: HashMap<String, String>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), DbError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DbError> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_basics() {
        let mut kv = MemoryKvStore::new();
        assert_eq!(kv.get(HAS_LAUNCHED_KEY).unwrap(), None);
        kv.set(HAS_LAUNCHED_KEY, "true").unwrap();
        kv.set(EXERCISES_KEY, "[]").unwrap();
        assert_eq!(kv.get(HAS_LAUNCHED_KEY).unwrap().as_deref(), Some("true"));
        kv.remove(HAS_LAUNCHED_KEY).unwrap();
        assert_eq!(kv.len(), 1);
        kv.clear().unwrap();
        assert!(kv.is_empty());
    }
}
