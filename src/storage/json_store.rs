use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use super::EntryBackend;
use crate::entity::{EntryRecord, JournalEntry};
use crate::error::{JournalError, Result};

pub const JSON_FILE: &str = "journalEntries.json";

/// On-disk layout of the data file
#[derive(Debug, Default, Serialize, Deserialize)]
struct EntryFile {
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

/// Flat-file store: the whole collection lives in one JSON document that is
/// read, changed and rewritten on every operation.
pub struct JsonFileStore {
    path: PathBuf,
    // serialises read-modify-write cycles within this process
    lock: Mutex<()>,
}

/// Entries written when the data file does not exist yet.
pub fn seed_entries() -> Vec<JournalEntry> {
    let date = Utc
        .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    vec![JournalEntry::from_record(
        "1".to_string(),
        EntryRecord {
            title: "Welcome to your journal".to_string(),
            date,
            summary: "This is a sample entry. Edit or delete it, then start writing your own."
                .to_string(),
            mood: String::new(),
            img_name: String::new(),
        },
    )]
}

impl JsonFileStore {
    /// Open the data file at `path`, creating it with the default seed
    /// entries if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_seed(path, seed_entries())
    }

    /// Like [`JsonFileStore::open`], with an explicit seed collection.
    pub fn with_seed(path: impl Into<PathBuf>, seed: Vec<JournalEntry>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };

        if let Some(parent) = store.parent_dir() {
            fs::create_dir_all(parent)?;
        }

        if !store.path.exists() {
            tracing::info!(path = %store.path.display(), "creating data file");
            store.save(seed)?;
        }

        Ok(store)
    }

    /// Attach to `path` without creating or seeding anything. A missing
    /// file reads as an empty collection until the first write.
    pub fn unseeded(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Read the collection. A missing or unparsable file reads as empty.
    fn load(&self) -> Result<Vec<JournalEntry>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<EntryFile>(&text) {
            Ok(file) => Ok(file.entries),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable data file, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Sort newest first and replace the file through a temp file + rename.
    fn save(&self, mut entries: Vec<JournalEntry>) -> Result<()> {
        entries.sort_by(|a, b| b.date.cmp(&a.date));

        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), &EntryFile { entries })?;
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| JournalError::Io(e.error))?;
        Ok(())
    }
}

/// Millisecond timestamp token, bumped until unused.
fn mint_id(entries: &[JournalEntry]) -> String {
    let mut token = Utc::now().timestamp_millis();
    loop {
        let id = token.to_string();
        if !entries.iter().any(|e| e.id == id) {
            return id;
        }
        token += 1;
    }
}

#[async_trait]
impl EntryBackend for JsonFileStore {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn list(&self) -> Result<Vec<JournalEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load()?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.into_iter().find(|e| e.id == id))
    }

    async fn upsert(&self, id: Option<&str>, record: EntryRecord) -> Result<JournalEntry> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load()?;

        let entry = match id {
            Some(id) => {
                let slot = entries
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| JournalError::NotFound(id.to_string()))?;
                *slot = JournalEntry::from_record(id.to_string(), record);
                slot.clone()
            }
            None => {
                let entry = JournalEntry::from_record(mint_id(&entries), record);
                entries.push(entry.clone());
                entry
            }
        };

        self.save(entries)?;
        Ok(entry)
    }

    async fn delete(&self, id: &str) -> Result<Option<JournalEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load()?;

        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return Ok(None);
        };

        let removed = entries.remove(pos);
        self.save(entries)?;
        Ok(Some(removed))
    }
}
