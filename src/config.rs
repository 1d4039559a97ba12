use std::path::{Path, PathBuf};

use clap::Args;

use crate::storage::{BackendKind, JSON_FILE, SQLITE_DB};

pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server settings. Every flag can also come from the environment.
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Storage backend
    #[arg(long, env = "JOURNAL_BACKEND", value_enum, default_value_t = BackendKind::Sqlite)]
    pub backend: BackendKind,

    /// Directory for the database or JSON data file
    #[arg(long, env = "JOURNAL_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// SQLite database path (defaults to <data-dir>/journal.db)
    #[arg(long, env = "JOURNAL_DATABASE")]
    pub database: Option<PathBuf>,

    /// Directory for uploaded images
    #[arg(long, env = "JOURNAL_UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Maximum request body size in bytes
    #[arg(long, env = "JOURNAL_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            backend: BackendKind::default(),
            data_dir: PathBuf::from("data"),
            database: None,
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Config with data and uploads kept under `root`.
    pub fn rooted_at(root: &Path, backend: BackendKind) -> Self {
        Self {
            backend,
            data_dir: root.join("data"),
            uploads_dir: root.join("uploads"),
            ..Self::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SQLITE_DB))
    }

    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join(JSON_FILE)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
