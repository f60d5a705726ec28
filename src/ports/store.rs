//! Option and metadata store port.

use std::collections::HashMap;

use crate::error::StoreError;

/// Key/value storage owned by the host application.
///
/// Project options are scoped by project identifier, group metadata by
/// group identifier. Both are plain strings; an absent key is `None`.
pub trait ConfigStore: Send + Sync {
    /// Reads a project-scoped option.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_option(&self, project: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a project-scoped option. `None` removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_option(&self, project: &str, key: &str, value: Option<&str>) -> Result<(), StoreError>;

    /// Reads one group's metadata value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_group_value(&self, group: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes one group's metadata value, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_group_value(&self, group: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Reads a metadata value for many groups in one pass.
    ///
    /// Groups without a value are absent from the returned map.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_group_values(
        &self,
        groups: &[&str],
        key: &str,
    ) -> Result<HashMap<String, String>, StoreError>;
}
