//! Database container.

use crate::collection::Collection;
use crate::config::{CollectionConfig, DatabaseConfig};
use crate::error::CoreResult;
use crate::model::Model;
use crate::schema::Schema;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

/// The NeisanDB entry point.
///
/// A `Database` holds a directory and a database-wide concurrency
/// limiter; collections carry all the actual machinery. Collection
/// files live under `<directory>/data/<name>.nsdb`.
///
/// # Example
///
/// ```rust,ignore
/// use neisandb_core::{CollectionConfig, Database, DatabaseConfig, Schema};
///
/// let db = Database::open(DatabaseConfig::new().directory("./mydb")).await?;
/// let users = db
///     .collection::<User>(CollectionConfig::new("users").unique("email"), user_schema())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    directory: PathBuf,
    limiter: Arc<Semaphore>,
}

impl Database {
    /// Opens a database rooted at the configured directory.
    ///
    /// Creates the directory tree if missing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`](crate::CoreError) when
    /// the concurrency limit is outside [1, 100], or an I/O error if
    /// the directory cannot be created.
    pub async fn open(config: DatabaseConfig) -> CoreResult<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(config.directory.join("data")).await?;
        info!(directory = %config.directory.display(), "opened database");
        Ok(Self {
            directory: config.directory,
            limiter: Arc::new(Semaphore::new(config.concurrency)),
        })
    }

    /// Returns the database root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the named collection's page file.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.directory.join("data").join(format!("{name}.nsdb"))
    }

    /// Opens a typed collection, recovering its state from disk when
    /// the file already holds pages.
    ///
    /// Each call builds an independent handle over the same file; open
    /// a collection once per process and clone the handle instead.
    pub async fn collection<M: Model>(
        &self,
        config: CollectionConfig,
        schema: Schema,
    ) -> CoreResult<Collection<M>> {
        let path = self.collection_path(&config.name);
        Collection::open(&path, config, schema, Arc::clone(&self.limiter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_data_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let db = Database::open(DatabaseConfig::new().directory(&root))
            .await
            .unwrap();

        assert!(root.join("data").is_dir());
        assert_eq!(
            db.collection_path("users"),
            root.join("data").join("users.nsdb")
        );
    }

    #[tokio::test]
    async fn open_rejects_bad_concurrency() {
        let dir = tempdir().unwrap();
        let config = DatabaseConfig::new().directory(dir.path()).concurrency(0);
        assert!(Database::open(config).await.is_err());
    }
}
