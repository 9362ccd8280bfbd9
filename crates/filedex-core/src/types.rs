//! Small newtypes shared across crates, following the wrapper-with-intent
//! convention (a numeric id is never passed around as a bare `i64`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat-platform user id. Principals are identified by this number for
/// the lifetime of the system; it is never reused or reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PrincipalId {
    fn from(v: i64) -> Self {
        PrincipalId(v)
    }
}

/// A chat/channel id on the platform. Negative for supergroups/channels,
/// matching the platform's own numbering convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message id within a chat. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// Seconds a caller must wait before retrying, carried by flood-wait and
/// rate-limit signals alike so both paths share one sleep-and-retry idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetryAfter(pub u64);

impl RetryAfter {
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0)
    }
}

/// A supported media kind, replacing an introspective attribute walk over
/// the platform's message object with an explicit tagged switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Video,
    Audio,
    Document,
    Photo,
    Animation,
    Application,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Document => "document",
            FileType::Photo => "photo",
            FileType::Animation => "animation",
            FileType::Application => "application",
        }
    }

    /// Media kinds accepted by the ingestion pipeline. Photos and
    /// animations are indexable entities but are not pulled from the live
    /// channel watch, matching the ingestion filter in the design.
    pub fn ingestible() -> &'static [FileType] {
        &[FileType::Video, FileType::Audio, FileType::Document]
    }
}

impl std::str::FromStr for FileType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(FileType::Video),
            "audio" => Ok(FileType::Audio),
            "document" => Ok(FileType::Document),
            "photo" => Ok(FileType::Photo),
            "animation" => Ok(FileType::Animation),
            "application" => Ok(FileType::Application),
            other => Err(crate::error::Error::InvalidFileType(other.to_string())),
        }
    }
}

/// Status of a Principal, replacing a loose string with a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalStatus {
    Active,
    Banned,
    Inactive,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn file_type_round_trips_through_str() {
        for ft in [
            FileType::Video,
            FileType::Audio,
            FileType::Document,
            FileType::Photo,
            FileType::Animation,
            FileType::Application,
        ] {
            assert_eq!(FileType::from_str(ft.as_str()).unwrap(), ft);
        }
    }

    #[test]
    fn unknown_file_type_is_invalid() {
        assert!(FileType::from_str("sticker").is_err());
    }
}
