//! Entry validation.
//!
//! Turns a raw [`EntryFields`] set into a canonical [`EntryRecord`], or an
//! ordered list of per-field violations suitable for highlighting form
//! fields. Validation is pure: no I/O, no clock.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::entity::{EntryFields, EntryRecord};

pub const TITLE_MAX: usize = 200;
pub const SUMMARY_MAX: usize = 5000;
pub const MOOD_MAX: usize = 200;
pub const IMG_NAME_MAX: usize = 1000;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub message: String,
    pub path: Vec<String>,
    pub context: Map<String, Value>,
}

impl Violation {
    fn new(field: &str, message: String, extra: Value) -> Self {
        let mut context = Map::new();
        context.insert("label".to_string(), Value::String(field.to_string()));
        context.insert("key".to_string(), Value::String(field.to_string()));
        if let Value::Object(extra) = extra {
            context.extend(extra);
        }
        Self {
            message,
            path: vec![field.to_string()],
            context,
        }
    }

    /// The field this violation refers to.
    pub fn field(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }
}

/// All violations found in one field set, in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub details: Vec<Violation>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.details.iter().any(|v| v.field() == field)
    }

    fn push(&mut self, violation: Violation) {
        self.details.push(violation);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.details.iter().map(|v| v.message.as_str()).collect();
        write!(f, "{}", messages.join(". "))
    }
}

struct StringRule {
    field: &'static str,
    required: bool,
    allow_empty: bool,
    max: usize,
}

const TITLE: StringRule = StringRule {
    field: "title",
    required: true,
    allow_empty: false,
    max: TITLE_MAX,
};

const SUMMARY: StringRule = StringRule {
    field: "summary",
    required: true,
    allow_empty: false,
    max: SUMMARY_MAX,
};

const MOOD: StringRule = StringRule {
    field: "mood",
    required: false,
    allow_empty: true,
    max: MOOD_MAX,
};

const IMG_NAME: StringRule = StringRule {
    field: "img_name",
    required: false,
    allow_empty: true,
    max: IMG_NAME_MAX,
};

fn check_string(
    rule: &StringRule,
    value: Option<&Value>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let field = rule.field;
    match value {
        None if rule.required => {
            errors.push(Violation::new(
                field,
                format!("\"{}\" is required", field),
                Value::Null,
            ));
            None
        }
        None => Some(String::new()),
        Some(Value::String(s)) if s.is_empty() && !rule.allow_empty => {
            errors.push(Violation::new(
                field,
                format!("\"{}\" is not allowed to be empty", field),
                json!({ "value": "" }),
            ));
            None
        }
        Some(Value::String(s)) if s.chars().count() > rule.max => {
            errors.push(Violation::new(
                field,
                format!(
                    "\"{}\" length must be less than or equal to {} characters long",
                    field, rule.max
                ),
                json!({ "limit": rule.max, "value": s }),
            ));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(Violation::new(
                field,
                format!("\"{}\" must be a string", field),
                json!({ "value": other }),
            ));
            None
        }
    }
}

fn check_date(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<DateTime<Utc>> {
    match value {
        None => {
            errors.push(Violation::new(
                "date",
                "\"date\" is required".to_string(),
                Value::Null,
            ));
            None
        }
        Some(Value::String(s)) => match parse_date(s) {
            Some(date) => Some(date),
            None => {
                errors.push(Violation::new(
                    "date",
                    "\"date\" must be in ISO 8601 date format".to_string(),
                    json!({ "value": s, "format": "iso" }),
                ));
                None
            }
        },
        Some(other) => {
            errors.push(Violation::new(
                "date",
                "\"date\" must be a valid date".to_string(),
                json!({ "value": other }),
            ));
            None
        }
    }
}

/// Parse an ISO 8601 date or date-time. Values without an offset are
/// taken as UTC; bare dates become midnight UTC. Only four-digit years
/// (0000 to 9999) are accepted.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    parse_iso(input).filter(|date| (0..=9999).contains(&date.year()))
}

fn parse_iso(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Validate a candidate field set.
pub fn validate(fields: &EntryFields) -> Result<EntryRecord, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = check_string(&TITLE, fields.title.as_ref(), &mut errors);
    let date = check_date(fields.date.as_ref(), &mut errors);
    let summary = check_string(&SUMMARY, fields.summary.as_ref(), &mut errors);
    let mood = check_string(&MOOD, fields.mood.as_ref(), &mut errors);
    let img_name = check_string(&IMG_NAME, fields.img_name.as_ref(), &mut errors);

    match (title, date, summary, mood, img_name) {
        (Some(title), Some(date), Some(summary), Some(mood), Some(img_name))
            if errors.is_empty() =>
        {
            Ok(EntryRecord {
                title,
                date,
                summary,
                mood,
                img_name,
            })
        }
        _ => Err(errors),
    }
}
