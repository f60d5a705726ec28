//! File-backed `ConfigStore` keeping one YAML document on disk.
//!
//! ```text
//! projects:
//!   <project>:
//!     phabricator:host: https://phab.example.com/
//! groups:
//!   <group>:
//!     phabricator:tid: "42"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ports::ConfigStore;

type Scoped = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    projects: Scoped,
    #[serde(default)]
    groups: Scoped,
}

/// Persists project options and group metadata in a YAML file.
///
/// Every operation re-reads the file; writes replace it whole. Concurrent
/// writers race with last-write-wins.
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    /// Creates a store backed by the given file. The file need not exist.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }

    fn read(&self) -> Result<StoreDocument, StoreError> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(&e))?;
        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| StoreError::Malformed {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let yaml = serde_yaml::to_string(doc).map_err(|e| StoreError::Malformed {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(&e))?;
        }
        std::fs::write(&self.path, yaml).map_err(|e| self.io_error(&e))
    }

    fn io_error(&self, err: &std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.display().to_string(), message: err.to_string() }
    }
}

fn lookup(scoped: &Scoped, scope: &str, key: &str) -> Option<String> {
    scoped.get(scope).and_then(|values| values.get(key)).cloned()
}

impl ConfigStore for YamlFileStore {
    fn get_option(&self, project: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lookup(&self.read()?.projects, project, key))
    }

    fn set_option(&self, project: &str, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let mut doc = self.read()?;
        match value {
            Some(v) => {
                doc.projects
                    .entry(project.to_string())
                    .or_default()
                    .insert(key.to_string(), v.to_string());
            }
            None => {
                if let Some(values) = doc.projects.get_mut(project) {
                    values.remove(key);
                    if values.is_empty() {
                        doc.projects.remove(project);
                    }
                }
            }
        }
        self.write(&doc)
    }

    fn get_group_value(&self, group: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lookup(&self.read()?.groups, group, key))
    }

    fn set_group_value(&self, group: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut doc = self.read()?;
        doc.groups.entry(group.to_string()).or_default().insert(key.to_string(), value.to_string());
        self.write(&doc)
    }

    fn get_group_values(
        &self,
        groups: &[&str],
        key: &str,
    ) -> Result<HashMap<String, String>, StoreError> {
        let doc = self.read()?;
        Ok(groups
            .iter()
            .filter_map(|g| lookup(&doc.groups, g, key).map(|v| ((*g).to_string(), v)))
            .collect())
    }
}
