use chrono::{DateTime, Utc};
use filedex_core::types::FileType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaFile {
    pub file_unique_id: String,
    pub file_id: String,
    pub file_ref: Option<String>,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    pub indexed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaFile {
    pub fn file_type(&self) -> Option<FileType> {
        self.file_type.parse().ok()
    }
}

/// A normalized media message ready to be checked against the index,
/// extracted from the platform's message object via an explicit tagged
/// switch rather than an attribute walk.
#[derive(Debug, Clone)]
pub struct IncomingMedia {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_ref: Option<String>,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: FileType,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

pub fn normalize_file_name(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if "_-.+".contains(c) { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub ok: bool,
    pub status: SaveStatus,
    pub existing: Option<MediaFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkSaveOutcome {
    pub saved: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileStats {
    pub total_count: i64,
    pub total_size: i64,
    pub by_type: Vec<TypeStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeStat {
    pub file_type: String,
    pub count: i64,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators_and_whitespace() {
        assert_eq!(normalize_file_name("foo_bar-baz.mp4"), "foo bar baz mp4");
        assert_eq!(normalize_file_name("a   b"), "a b");
        assert_eq!(normalize_file_name("  leading"), "leading");
    }
}
