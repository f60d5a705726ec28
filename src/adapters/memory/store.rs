//! In-memory `ConfigStore`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StoreError;
use crate::ports::ConfigStore;

type Scoped = HashMap<(String, String), String>;

/// A `ConfigStore` that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    options: Mutex<Scoped>,
    groups: Mutex<Scoped>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(scope: &str, key: &str) -> (String, String) {
    (scope.to_string(), key.to_string())
}

impl ConfigStore for MemoryStore {
    fn get_option(&self, project: &str, k: &str) -> Result<Option<String>, StoreError> {
        let options = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(options.get(&key(project, k)).cloned())
    }

    fn set_option(&self, project: &str, k: &str, value: Option<&str>) -> Result<(), StoreError> {
        let mut options = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        match value {
            Some(v) => options.insert(key(project, k), v.to_string()),
            None => options.remove(&key(project, k)),
        };
        Ok(())
    }

    fn get_group_value(&self, group: &str, k: &str) -> Result<Option<String>, StoreError> {
        let groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.get(&key(group, k)).cloned())
    }

    fn set_group_value(&self, group: &str, k: &str, value: &str) -> Result<(), StoreError> {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        groups.insert(key(group, k), value.to_string());
        Ok(())
    }

    fn get_group_values(
        &self,
        group_ids: &[&str],
        k: &str,
    ) -> Result<HashMap<String, String>, StoreError> {
        let groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(group_ids
            .iter()
            .filter_map(|g| groups.get(&key(g, k)).map(|v| ((*g).to_string(), v.clone())))
            .collect())
    }
}
