//! Managed image uploads.
//!
//! Uploaded files live in a single directory and are referenced from
//! entries as `uploads/<name>`. Anything else in `img_name` (external URLs,
//! caller-supplied paths) is never touched.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::error::Result;

/// Prefix of every `img_name` that points at a managed upload.
pub const UPLOADS_PREFIX: &str = "uploads";

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Open the uploads directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate a collision-resistant file name that keeps the original
    /// extension: `<unix-millis>-<random>.<ext>`.
    pub fn generate_name(original_name: &str) -> String {
        let random = Uuid::new_v4();
        let suffix: String = random
            .as_bytes()
            .iter()
            .take(SUFFIX_LEN)
            .map(|b| SUFFIX_ALPHABET[*b as usize % SUFFIX_ALPHABET.len()] as char)
            .collect();

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, ext)
    }

    /// Persist an uploaded file and return the relative path to store in
    /// the entry's `img_name`.
    pub async fn store_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let name = Self::generate_name(original_name);
        fs::write(self.dir.join(&name), bytes).await?;
        tracing::debug!(file = %name, size = bytes.len(), "stored upload");
        Ok(format!("{}/{}", UPLOADS_PREFIX, name))
    }

    /// Whether `path` refers to a file under the managed uploads prefix.
    pub fn is_managed(path: &str) -> bool {
        managed_relative(path).is_some()
    }

    /// Absolute location of a managed upload, if `path` is one.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        managed_relative(path).map(|rel| self.dir.join(rel))
    }

    /// Best-effort delete of a managed upload. External paths are ignored,
    /// a missing file is not an error and other failures are only logged.
    /// Returns true if a file was removed.
    pub async fn delete_if_managed(&self, path: &str) -> bool {
        let Some(file) = self.resolve(path) else {
            return false;
        };

        match fs::remove_file(&file).await {
            Ok(()) => {
                tracing::debug!(file = %file.display(), "removed upload");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = %file.display(), "upload already gone");
                false
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "failed to remove upload");
                false
            }
        }
    }
}

/// The part of `path` below `uploads/`, provided it stays inside the
/// uploads directory.
fn managed_relative(path: &str) -> Option<&Path> {
    let rest = path.strip_prefix(UPLOADS_PREFIX)?.strip_prefix('/')?;
    let rel = Path::new(rest);

    let mut components = rel.components().peekable();
    components.peek()?;
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(rel)
    } else {
        None
    }
}
