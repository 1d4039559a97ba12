use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::EntryBackend;
use crate::entity::{date_key, EntryRecord, JournalEntry};
use crate::error::{JournalError, Result};

pub const SQLITE_DB: &str = "journal.db";

/// Document store on SQLite: each entry is one JSON document keyed by id,
/// with the date pulled out into an integer millisecond column for ordering.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw row: id, doc, created_at, updated_at
type EntryRow = (String, String, String, String);

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                date_ms INTEGER NOT NULL,
                doc TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_journal_entries_date ON journal_entries(date_ms)",
            [],
        )?;

        Ok(())
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<JournalEntry>> {
        let row: Option<EntryRow> = conn
            .query_row(
                "SELECT id, doc, created_at, updated_at FROM journal_entries WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(entry_from_row).transpose()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| JournalError::Storage(format!("bad timestamp '{}': {}", value, e)))
}

fn entry_from_row((id, doc, created_at, updated_at): EntryRow) -> Result<JournalEntry> {
    let record: EntryRecord = serde_json::from_str(&doc)?;
    let mut entry = JournalEntry::from_record(id, record);
    entry.created_at = Some(parse_timestamp(&created_at)?);
    entry.updated_at = Some(parse_timestamp(&updated_at)?);
    Ok(entry)
}

#[async_trait]
impl EntryBackend for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, doc, created_at, updated_at FROM journal_entries
             ORDER BY date_ms DESC, created_at DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<EntryRow>, _>>()?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<JournalEntry>> {
        let conn = self.conn.lock().await;
        Self::fetch(&conn, id)
    }

    async fn upsert(&self, id: Option<&str>, record: EntryRecord) -> Result<JournalEntry> {
        let conn = self.conn.lock().await;
        let now = date_key(&Utc::now());
        let doc = serde_json::to_string(&record)?;
        let date_ms = record.date.timestamp_millis();

        let id = match id {
            Some(id) => {
                let changed = conn.execute(
                    "UPDATE journal_entries SET date_ms = ?2, doc = ?3, updated_at = ?4 WHERE id = ?1",
                    params![id, date_ms, doc, now],
                )?;
                if changed == 0 {
                    return Err(JournalError::NotFound(id.to_string()));
                }
                id.to_string()
            }
            None => {
                let id = Uuid::new_v4().simple().to_string();
                conn.execute(
                    "INSERT INTO journal_entries (id, date_ms, doc, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![id, date_ms, doc, now],
                )?;
                id
            }
        };

        Self::fetch(&conn, &id)?.ok_or(JournalError::NotFound(id))
    }

    async fn delete(&self, id: &str) -> Result<Option<JournalEntry>> {
        let conn = self.conn.lock().await;
        let Some(entry) = Self::fetch(&conn, id)? else {
            return Ok(None);
        };

        conn.execute("DELETE FROM journal_entries WHERE id = ?1", [id])?;
        Ok(Some(entry))
    }
}

// Implement From for rusqlite::Error
impl From<rusqlite::Error> for JournalError {
    fn from(e: rusqlite::Error) -> Self {
        JournalError::Storage(format!("SQLite error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(title: &str, day: u32) -> EntryRecord {
        EntryRecord {
            title: title.to_string(),
            date: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            summary: format!("{} summary", title),
            mood: String::new(),
            img_name: String::new(),
        }
    }

    #[test]
    fn test_open_creates_db() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join(SQLITE_DB);
        let _store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store.upsert(None, record("First", 1)).await.unwrap();

        assert!(!created.id.is_empty());
        assert!(created.created_at.is_some());
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.record(), record("First", 1));

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list_sorted_by_date_desc() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(None, record("Two", 2)).await.unwrap();
        store.upsert(None, record("One", 1)).await.unwrap();
        store.upsert(None, record("Three", 3)).await.unwrap();

        let titles: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Three", "Two", "One"]);
    }

    #[tokio::test]
    async fn test_list_orders_across_year_boundaries() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut far = record("Far", 1);
        far.date = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let mut ancient = record("Ancient", 1);
        ancient.date = Utc.with_ymd_and_hms(-50, 1, 1, 0, 0, 0).unwrap();

        store.upsert(None, record("Now", 1)).await.unwrap();
        store.upsert(None, far).await.unwrap();
        store.upsert(None, ancient).await.unwrap();

        let titles: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Far", "Now", "Ancient"]);
    }

    #[tokio::test]
    async fn test_replace_keeps_id_and_created_at() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store.upsert(None, record("Draft", 1)).await.unwrap();

        let mut changed = record("Final", 5);
        changed.mood = "Proud".to_string();
        let updated = store.upsert(Some(&created.id), changed.clone()).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.record(), changed);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_unknown_id_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.upsert(Some("missing"), record("X", 1)).await.unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_entry() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store.upsert(None, record("Gone", 1)).await.unwrap();

        let removed = store.delete(&created.id).await.unwrap().unwrap();
        assert_eq!(removed.id, created.id);
        assert!(store.get(&created.id).await.unwrap().is_none());
        assert!(store.delete(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SQLITE_DB);

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(None, record("Kept", 1)).await.unwrap().id
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap().title, "Kept");
    }
}
