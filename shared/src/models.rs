/// Data model shared by the fetch tasks and the coordinator.
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::FetchError;

/// One URL to download. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Short id used to correlate log lines for this task.
    pub task_id: String,
    pub url: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            task_id: id[..8].to_string(),
            url: url.into(),
        }
    }
}

/// How a fetch task ended.
#[derive(Debug)]
pub enum Outcome {
    Downloaded { path: PathBuf, bytes: u64 },
    Failed(FetchError),
}

/// The single report a fetch task emits.
///
/// `Display` renders the user-visible status line.
#[derive(Debug)]
pub struct StatusMessage {
    pub task_id: String,
    pub url: String,
    pub outcome: Outcome,
    pub finished_at: DateTime<Utc>,
}

impl StatusMessage {
    pub fn new(request: &DownloadRequest, outcome: Outcome) -> Self {
        Self {
            task_id: request.task_id.clone(),
            url: request.url.clone(),
            outcome,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Downloaded { .. })
    }

    /// Path of the written file, if the download succeeded.
    pub fn path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            Outcome::Downloaded { path, .. } => Some(path),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            Outcome::Failed(e) => Some(e),
            Outcome::Downloaded { .. } => None,
        }
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            Outcome::Downloaded { path, .. } => {
                write!(f, "Downloaded {} -> {}", self.url, path.display())
            }
            Outcome::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Totals for one run, computed from the drained status messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_written: u64,
}

impl RunSummary {
    pub fn from_messages(messages: &[StatusMessage]) -> Self {
        messages.iter().fold(Self::default(), |mut summary, msg| {
            summary.total += 1;
            match &msg.outcome {
                Outcome::Downloaded { bytes, .. } => {
                    summary.succeeded += 1;
                    summary.bytes_written += bytes;
                }
                Outcome::Failed(_) => summary.failed += 1,
            }
            summary
        })
    }
}
