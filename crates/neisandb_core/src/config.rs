//! Database and collection configuration.

use crate::error::{CoreError, CoreResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of entries a page tree holds before rotation.
pub const DEFAULT_TREE_CAPACITY: usize = 1500;

/// Default on-disk page size for data collections (256 KiB).
pub const DEFAULT_PAGE_SIZE: usize = 256 * 1024;

/// Default debounce interval for the automatic flush timer.
pub const DEFAULT_FLUSH_DEBOUNCE: Duration = Duration::from_secs(30);

/// Number of reserved header bytes at the start of each page.
///
/// Four bytes of little-endian body length, four bytes of padding; the
/// encoded tree starts at byte 8.
pub const PAGE_HEADER_LEN: usize = 8;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Root directory; collection files live under `<directory>/data/`.
    pub directory: PathBuf,

    /// Database-wide cap on concurrently mapped work. Range [1, 100].
    pub concurrency: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("neisandb"),
            concurrency: 25,
        }
    }
}

impl DatabaseConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database root directory.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Sets the database-wide concurrency limit.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Validates the configuration.
    pub(crate) fn validate(&self) -> CoreResult<()> {
        if self.concurrency < 1 || self.concurrency > 100 {
            return Err(CoreError::invalid_argument(format!(
                "concurrency must be in [1, 100], got {}",
                self.concurrency
            )));
        }
        Ok(())
    }
}

/// First id and LSN a collection allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStart {
    /// Counters start at 0.
    #[default]
    Zero,
    /// Counters start at 1.
    One,
}

impl IdStart {
    /// The numeric base.
    pub const fn base(self) -> u64 {
        match self {
            IdStart::Zero => 0,
            IdStart::One => 1,
        }
    }
}

/// Configuration for opening a collection.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Collection name; becomes the file stem of `<name>.nsdb`.
    pub name: String,

    /// Field names whose values must not repeat across live records.
    pub uniques: Vec<String>,

    /// First id/LSN the collection allocates.
    pub id_start: IdStart,

    /// On-disk page size in bytes.
    pub page_size: usize,

    /// Entries per page tree before rotation.
    pub tree_capacity: usize,

    /// Debounce interval for the automatic flush timer.
    pub flush_debounce: Duration,
}

impl CollectionConfig {
    /// Creates a configuration for the named collection with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uniques: Vec::new(),
            id_start: IdStart::Zero,
            page_size: DEFAULT_PAGE_SIZE,
            tree_capacity: DEFAULT_TREE_CAPACITY,
            flush_debounce: DEFAULT_FLUSH_DEBOUNCE,
        }
    }

    /// Declares a unique field.
    #[must_use]
    pub fn unique(mut self, field: impl Into<String>) -> Self {
        self.uniques.push(field.into());
        self
    }

    /// Sets the first id/LSN value.
    #[must_use]
    pub const fn id_start(mut self, id_start: IdStart) -> Self {
        self.id_start = id_start;
        self
    }

    /// Sets the on-disk page size.
    #[must_use]
    pub const fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the page tree capacity.
    #[must_use]
    pub const fn tree_capacity(mut self, tree_capacity: usize) -> Self {
        self.tree_capacity = tree_capacity;
        self
    }

    /// Sets the flush debounce interval.
    #[must_use]
    pub const fn flush_debounce(mut self, flush_debounce: Duration) -> Self {
        self.flush_debounce = flush_debounce;
        self
    }

    /// Validates the configuration.
    pub(crate) fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::invalid_argument("collection name is empty"));
        }
        if self.tree_capacity == 0 {
            return Err(CoreError::invalid_argument("tree_capacity must be > 0"));
        }
        if self.page_size <= PAGE_HEADER_LEN {
            return Err(CoreError::invalid_argument(format!(
                "page_size must exceed the {PAGE_HEADER_LEN}-byte header"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.directory, PathBuf::from("neisandb"));
        assert_eq!(config.concurrency, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn database_concurrency_bounds() {
        assert!(DatabaseConfig::new().concurrency(0).validate().is_err());
        assert!(DatabaseConfig::new().concurrency(101).validate().is_err());
        assert!(DatabaseConfig::new().concurrency(1).validate().is_ok());
        assert!(DatabaseConfig::new().concurrency(100).validate().is_ok());
    }

    #[test]
    fn collection_builder() {
        let config = CollectionConfig::new("users")
            .unique("email")
            .id_start(IdStart::One)
            .tree_capacity(10);

        assert_eq!(config.name, "users");
        assert_eq!(config.uniques, vec!["email".to_string()]);
        assert_eq!(config.id_start.base(), 1);
        assert_eq!(config.tree_capacity, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn collection_rejects_degenerate_values() {
        assert!(CollectionConfig::new("").validate().is_err());
        assert!(CollectionConfig::new("x").tree_capacity(0).validate().is_err());
        assert!(CollectionConfig::new("x").page_size(8).validate().is_err());
    }
}
