use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Started,
    Completed,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Started => "Started",
            UploadStatus::Completed => "Completed",
        }
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Started" => Ok(UploadStatus::Started),
            "Completed" => Ok(UploadStatus::Completed),
            other => Err(format!("unknown upload status '{}'", other)),
        }
    }
}

/// One submitted bulk file and its processing outcome.
///
/// `valid_count + invalid_count == total_rows` holds once `status` is
/// `Completed`. `error_file` is a path relative to the media root and is only
/// present when at least one row was rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: String,
    pub file: String,
    pub total_rows: u32,
    pub valid_count: u32,
    pub invalid_count: u32,
    pub status: UploadStatus,
    pub error_file: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
