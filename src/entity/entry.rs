// src/entity/entry.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored journal entry, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub img_name: String,
    /// Set only by the document store.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn from_record(id: String, record: EntryRecord) -> Self {
        Self {
            id,
            title: record.title,
            date: record.date,
            summary: record.summary,
            mood: record.mood,
            img_name: record.img_name,
            created_at: None,
            updated_at: None,
        }
    }

    /// The user-settable part of the entry.
    pub fn record(&self) -> EntryRecord {
        EntryRecord {
            title: self.title.clone(),
            date: self.date,
            summary: self.summary.clone(),
            mood: self.mood.clone(),
            img_name: self.img_name.clone(),
        }
    }
}

/// Canonical record produced by the validator and handed to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub title: String,
    pub date: DateTime<Utc>,
    pub summary: String,
    pub mood: String,
    pub img_name: String,
}

/// Raw, unvalidated field set taken from a request body.
///
/// `None` means the field was absent. Values are kept as JSON so the
/// validator can report type errors instead of failing deserialization.
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntryFields {
    pub title: Option<Value>,
    pub date: Option<Value>,
    pub summary: Option<Value>,
    pub mood: Option<Value>,
    pub img_name: Option<Value>,
}

impl EntryFields {
    /// Set a field from a text value (multipart forms). Returns false for
    /// unknown field names, which are dropped.
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "title" => &mut self.title,
            "date" => &mut self.date,
            "summary" => &mut self.summary,
            "mood" => &mut self.mood,
            "img_name" => &mut self.img_name,
            _ => return false,
        };
        *slot = Some(Value::String(value));
        true
    }
}

/// Sort/storage key for a date: fixed-width RFC 3339 in UTC, so lexical
/// order matches chronological order.
pub fn date_key(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_falsy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Build the candidate for a new entry. `mood` and `img_name` default to
/// the empty string; an uploaded file takes precedence over `img_name`.
pub fn create_candidate(fields: EntryFields, upload: Option<&str>) -> EntryFields {
    let mood = if is_falsy(&fields.mood) {
        Some(Value::String(String::new()))
    } else {
        fields.mood
    };

    let img_name = match upload {
        Some(path) => Some(Value::String(path.to_string())),
        None if is_falsy(&fields.img_name) => Some(Value::String(String::new())),
        None => fields.img_name,
    };

    EntryFields {
        title: fields.title,
        date: fields.date,
        summary: fields.summary,
        mood,
        img_name,
    }
}

/// Lay a partial update over an existing entry. Absent fields keep their
/// stored value; present fields (including empty strings) override it.
pub fn merge(existing: &JournalEntry, patch: EntryFields, upload: Option<&str>) -> EntryFields {
    let keep = |value: Option<Value>, current: &str| {
        Some(value.unwrap_or_else(|| Value::String(current.to_string())))
    };

    let img_name = match upload {
        Some(path) => Some(Value::String(path.to_string())),
        None => keep(patch.img_name, &existing.img_name),
    };

    EntryFields {
        title: keep(patch.title, &existing.title),
        date: keep(patch.date, &existing.date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        summary: keep(patch.summary, &existing.summary),
        mood: keep(patch.mood, &existing.mood),
        img_name,
    }
}
