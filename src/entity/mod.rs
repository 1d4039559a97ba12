mod entry;

pub use entry::{create_candidate, date_key, merge, EntryFields, EntryRecord, JournalEntry};
