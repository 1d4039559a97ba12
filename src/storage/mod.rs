//! Persistence backends.
//!
//! Two interchangeable implementations of [`EntryBackend`]: a SQLite
//! document store and a single JSON file. Callers only see the trait; the
//! concrete store is chosen once at startup.

mod json_store;
mod sqlite_store;

pub use json_store::{seed_entries, JsonFileStore, JSON_FILE};
pub use sqlite_store::{SqliteStore, SQLITE_DB};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::config::ServerConfig;
use crate::entity::{EntryRecord, JournalEntry};
use crate::error::Result;

#[async_trait]
pub trait EntryBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// All entries, newest `date` first.
    async fn list(&self) -> Result<Vec<JournalEntry>>;

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>>;

    /// Insert a new entry when `id` is `None`, otherwise replace the whole
    /// record stored under `id`. Replacing an unknown id fails with
    /// `NotFound`.
    async fn upsert(&self, id: Option<&str>, record: EntryRecord) -> Result<JournalEntry>;

    /// Remove an entry, returning it if it existed.
    async fn delete(&self, id: &str) -> Result<Option<JournalEntry>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// SQLite document store
    #[default]
    Sqlite,
    /// Single JSON file, rewritten on every change
    Json,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Json => write!(f, "json"),
        }
    }
}

/// Open the backend selected in the configuration.
pub fn open_backend(config: &ServerConfig) -> Result<Arc<dyn EntryBackend>> {
    let backend: Arc<dyn EntryBackend> = match config.backend {
        BackendKind::Sqlite => Arc::new(SqliteStore::open(&config.database_path())?),
        BackendKind::Json => Arc::new(JsonFileStore::open(config.json_path())?),
    };
    tracing::info!(backend = backend.name(), "opened entry backend");
    Ok(backend)
}

/// Open the configured backend for reading only. Nothing is created on
/// disk: a missing database or data file reads as an empty collection.
pub fn open_backend_for_reading(config: &ServerConfig) -> Result<Arc<dyn EntryBackend>> {
    let backend: Arc<dyn EntryBackend> = match config.backend {
        BackendKind::Sqlite => {
            let path = config.database_path();
            if path.exists() {
                Arc::new(SqliteStore::open(&path)?)
            } else {
                Arc::new(SqliteStore::open_in_memory()?)
            }
        }
        BackendKind::Json => Arc::new(JsonFileStore::unseeded(config.json_path())),
    };
    Ok(backend)
}
