//! Entry service: request-level create/read/update/delete.
//!
//! Ties validation, upload cleanup and the storage backend together. Any
//! file uploaded with a request that does not end in a committed entry is
//! removed again.

use std::sync::Arc;

use crate::entity::{create_candidate, merge, EntryFields, JournalEntry};
use crate::error::{JournalError, Result};
use crate::storage::EntryBackend;
use crate::uploads::UploadStore;
use crate::validation::validate;

#[derive(Clone)]
pub struct JournalService {
    backend: Arc<dyn EntryBackend>,
    uploads: UploadStore,
}

impl JournalService {
    pub fn new(backend: Arc<dyn EntryBackend>, uploads: UploadStore) -> Self {
        Self { backend, uploads }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn list(&self) -> Result<Vec<JournalEntry>> {
        self.backend.list().await
    }

    pub async fn get(&self, id: &str) -> Result<JournalEntry> {
        self.backend
            .get(id)
            .await?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))
    }

    /// Create an entry. `upload` is the `uploads/...` path of a file
    /// already stored for this request, if any.
    pub async fn create(&self, fields: EntryFields, upload: Option<String>) -> Result<JournalEntry> {
        let candidate = create_candidate(fields, upload.as_deref());

        let record = match validate(&candidate) {
            Ok(record) => record,
            Err(errors) => {
                self.discard_upload(upload.as_deref()).await;
                return Err(errors.into());
            }
        };

        match self.backend.upsert(None, record).await {
            Ok(entry) => {
                tracing::debug!(id = %entry.id, "created entry");
                Ok(entry)
            }
            Err(e) => {
                self.discard_upload(upload.as_deref()).await;
                Err(e)
            }
        }
    }

    /// Apply a partial update. Fields absent from `patch` keep their stored
    /// value. A new upload replaces (and deletes) the previous managed file.
    pub async fn update(
        &self,
        id: &str,
        patch: EntryFields,
        upload: Option<String>,
    ) -> Result<JournalEntry> {
        let existing = match self.backend.get(id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.discard_upload(upload.as_deref()).await;
                return Err(JournalError::NotFound(id.to_string()));
            }
            Err(e) => {
                self.discard_upload(upload.as_deref()).await;
                return Err(e);
            }
        };

        let candidate = merge(&existing, patch, upload.as_deref());
        let record = match validate(&candidate) {
            Ok(record) => record,
            Err(errors) => {
                self.discard_upload(upload.as_deref()).await;
                return Err(errors.into());
            }
        };

        let updated = match self.backend.upsert(Some(id), record).await {
            Ok(entry) => entry,
            Err(e) => {
                self.discard_upload(upload.as_deref()).await;
                return Err(e);
            }
        };

        if upload.is_some() && existing.img_name != updated.img_name {
            self.uploads.delete_if_managed(&existing.img_name).await;
        }

        tracing::debug!(id = %updated.id, "updated entry");
        Ok(updated)
    }

    /// Delete an entry and, best-effort, its managed upload.
    pub async fn delete(&self, id: &str) -> Result<JournalEntry> {
        let removed = self
            .backend
            .delete(id)
            .await?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))?;

        self.uploads.delete_if_managed(&removed.img_name).await;

        tracing::debug!(id = %removed.id, "deleted entry");
        Ok(removed)
    }

    async fn discard_upload(&self, upload: Option<&str>) {
        if let Some(path) = upload {
            self.uploads.delete_if_managed(path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntryRecord;
    use crate::storage::{JsonFileStore, SqliteStore, JSON_FILE};
    use async_trait::async_trait;
    use serde_json::Value;
    use tempfile::TempDir;

    /// Backend that serves one fixed entry and refuses every write.
    struct ReadOnlyBackend {
        entry: JournalEntry,
    }

    #[async_trait]
    impl EntryBackend for ReadOnlyBackend {
        fn name(&self) -> &'static str {
            "read-only"
        }

        async fn list(&self) -> Result<Vec<JournalEntry>> {
            Ok(vec![self.entry.clone()])
        }

        async fn get(&self, id: &str) -> Result<Option<JournalEntry>> {
            Ok(Some(self.entry.clone()).filter(|e| e.id == id))
        }

        async fn upsert(&self, _id: Option<&str>, _record: EntryRecord) -> Result<JournalEntry> {
            Err(JournalError::Storage("disk is read-only".to_string()))
        }

        async fn delete(&self, _id: &str) -> Result<Option<JournalEntry>> {
            Err(JournalError::Storage("disk is read-only".to_string()))
        }
    }

    fn read_only_service(tmp: &TempDir) -> JournalService {
        let record = crate::validation::validate(&create_candidate(fields("A", "2025-01-01"), None))
            .unwrap();
        let backend = Arc::new(ReadOnlyBackend {
            entry: JournalEntry::from_record("fixed".to_string(), record),
        });
        let uploads = UploadStore::open(tmp.path().join("uploads")).unwrap();
        JournalService::new(backend, uploads)
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::String(s.to_string()))
    }

    fn fields(title: &str, date: &str) -> EntryFields {
        EntryFields {
            title: text(title),
            date: text(date),
            summary: text("s"),
            ..Default::default()
        }
    }

    fn sqlite_service(tmp: &TempDir) -> JournalService {
        let backend = Arc::new(SqliteStore::open_in_memory().unwrap());
        let uploads = UploadStore::open(tmp.path().join("uploads")).unwrap();
        JournalService::new(backend, uploads)
    }

    fn json_service(tmp: &TempDir) -> JournalService {
        let backend =
            Arc::new(JsonFileStore::with_seed(tmp.path().join(JSON_FILE), Vec::new()).unwrap());
        let uploads = UploadStore::open(tmp.path().join("uploads")).unwrap();
        JournalService::new(backend, uploads)
    }

    async fn upload(service: &JournalService, name: &str) -> String {
        service.uploads().store_upload(name, b"img").await.unwrap()
    }

    fn exists(service: &JournalService, rel: &str) -> bool {
        service.uploads().resolve(rel).unwrap().exists()
    }

    #[tokio::test]
    async fn test_create_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);

        let entry = service.create(fields("A", "2025-01-01"), None).await.unwrap();
        assert!(!entry.id.is_empty());
        assert_eq!(entry.mood, "");
        assert_eq!(entry.img_name, "");

        let fetched = service.get(&entry.id).await.unwrap();
        assert_eq!(fetched.record(), entry.record());
    }

    #[tokio::test]
    async fn test_create_invalid_discards_upload() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);
        let rel = upload(&service, "pic.png").await;

        let err = service
            .create(fields("", "2025-01-01"), Some(rel.clone()))
            .await
            .unwrap_err();

        match err {
            JournalError::Validation(errors) => assert!(errors.has_field("title")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(!exists(&service, &rel));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_partial_fields() {
        let tmp = TempDir::new().unwrap();
        let service = json_service(&tmp);

        let mut initial = fields("A", "2025-01-01");
        initial.mood = text("Happy");
        let entry = service.create(initial, None).await.unwrap();

        let patch = EntryFields {
            title: text("B"),
            ..Default::default()
        };
        let updated = service.update(&entry.id, patch, None).await.unwrap();

        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.title, "B");
        assert_eq!(updated.mood, "Happy");
        assert_eq!(updated.date, entry.date);
    }

    #[tokio::test]
    async fn test_update_preserves_untouched_date_precision() {
        let tmp = TempDir::new().unwrap();
        let service = json_service(&tmp);

        let entry = service
            .create(fields("A", "2025-01-01T10:00:00.123456Z"), None)
            .await
            .unwrap();

        let patch = EntryFields {
            mood: text("Great"),
            ..Default::default()
        };
        let updated = service.update(&entry.id, patch, None).await.unwrap();
        assert_eq!(updated.date, entry.date);
        assert_eq!(
            updated.date.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            "2025-01-01T10:00:00.123456Z"
        );
    }

    #[tokio::test]
    async fn test_create_backend_failure_discards_upload() {
        let tmp = TempDir::new().unwrap();
        let service = read_only_service(&tmp);
        let rel = upload(&service, "pic.png").await;

        let err = service
            .create(fields("B", "2025-02-01"), Some(rel.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, JournalError::Storage(_)), "got {:?}", err);
        assert!(!exists(&service, &rel));
    }

    #[tokio::test]
    async fn test_update_backend_failure_discards_upload() {
        let tmp = TempDir::new().unwrap();
        let service = read_only_service(&tmp);
        let rel = upload(&service, "pic.png").await;

        let patch = EntryFields {
            mood: text("Tired"),
            ..Default::default()
        };
        let err = service
            .update("fixed", patch, Some(rel.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, JournalError::Storage(_)), "got {:?}", err);
        assert!(!exists(&service, &rel));
    }

    #[tokio::test]
    async fn test_update_missing_entry_discards_upload() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);
        let rel = upload(&service, "pic.png").await;

        let err = service
            .update("nope", EntryFields::default(), Some(rel.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));
        assert!(!exists(&service, &rel));
    }

    #[tokio::test]
    async fn test_update_invalid_keeps_entry_and_discards_upload() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);
        let entry = service.create(fields("A", "2025-01-01"), None).await.unwrap();
        let rel = upload(&service, "pic.png").await;

        let patch = EntryFields {
            date: text("not-a-date"),
            ..Default::default()
        };
        let err = service.update(&entry.id, patch, Some(rel.clone())).await.unwrap_err();
        assert!(matches!(err, JournalError::Validation(_)));
        assert!(!exists(&service, &rel));
        assert_eq!(service.get(&entry.id).await.unwrap().img_name, "");
    }

    #[tokio::test]
    async fn test_update_with_new_upload_removes_old_file() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);

        let old = upload(&service, "old.png").await;
        let entry = service
            .create(fields("A", "2025-01-01"), Some(old.clone()))
            .await
            .unwrap();
        assert_eq!(entry.img_name, old);

        let new = upload(&service, "new.jpg").await;
        let updated = service
            .update(&entry.id, EntryFields::default(), Some(new.clone()))
            .await
            .unwrap();

        assert_eq!(updated.img_name, new);
        assert!(!exists(&service, &old));
        assert!(exists(&service, &new));
    }

    #[tokio::test]
    async fn test_update_without_upload_keeps_file() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);

        let rel = upload(&service, "keep.png").await;
        let entry = service
            .create(fields("A", "2025-01-01"), Some(rel.clone()))
            .await
            .unwrap();

        let patch = EntryFields {
            mood: text("Great"),
            ..Default::default()
        };
        let updated = service.update(&entry.id, patch, None).await.unwrap();
        assert_eq!(updated.img_name, rel);
        assert!(exists(&service, &rel));
    }

    #[tokio::test]
    async fn test_delete_removes_managed_file() {
        let tmp = TempDir::new().unwrap();
        let service = json_service(&tmp);

        let rel = upload(&service, "pic.png").await;
        let entry = service
            .create(fields("A", "2025-01-01"), Some(rel.clone()))
            .await
            .unwrap();

        let removed = service.delete(&entry.id).await.unwrap();
        assert_eq!(removed.id, entry.id);
        assert!(!exists(&service, &rel));

        let err = service.delete(&entry.id).await.unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_leaves_external_image_alone() {
        let tmp = TempDir::new().unwrap();
        let service = sqlite_service(&tmp);

        let mut input = fields("A", "2025-01-01");
        input.img_name = text("https://example.com/cat.png");
        let entry = service.create(input, None).await.unwrap();
        assert_eq!(entry.img_name, "https://example.com/cat.png");

        service.delete(&entry.id).await.unwrap();
        assert!(matches!(
            service.get(&entry.id).await.unwrap_err(),
            JournalError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_date_desc() {
        let tmp = TempDir::new().unwrap();
        for service in [sqlite_service(&tmp), json_service(&tmp)] {
            service.create(fields("D1", "2025-01-01"), None).await.unwrap();
            service.create(fields("D3", "2025-03-01"), None).await.unwrap();
            service.create(fields("D2", "2025-02-01"), None).await.unwrap();

            let titles: Vec<String> = service
                .list()
                .await
                .unwrap()
                .into_iter()
                .map(|e| e.title)
                .collect();
            assert_eq!(titles, vec!["D3", "D2", "D1"], "backend {}", service.backend_name());
        }
    }
}
