// crates/core/src/jobs/types.rs
//! Types shared across the job lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for one upload-to-completion lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id (UUID v4, no hyphens).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Metadata captured when a job is created. Written once, read-only after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub filename: String,
}

impl JobMetadata {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// Lifecycle stage of a job.
///
/// Scenarios walk `Uploaded → OcrProcessing → EntityExtraction →
/// RuleApplication → Completed`. `Failed` is the alternate terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Uploaded,
    OcrProcessing,
    EntityExtraction,
    RuleApplication,
    Completed,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Uploaded => "UPLOADED",
            Stage::OcrProcessing => "OCR_PROCESSING",
            Stage::EntityExtraction => "ENTITY_EXTRACTION",
            Stage::RuleApplication => "RULE_APPLICATION",
            Stage::Completed => "COMPLETED",
            Stage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage transition, as published on the event bus and sent to clients.
///
/// Serialized as `{ fileId, status, message, progress }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    #[serde(rename = "fileId")]
    pub job_id: JobId,
    #[serde(rename = "status")]
    pub stage: Stage,
    pub message: String,
    /// 0–100, non-decreasing within one job.
    #[serde(rename = "progress")]
    pub progress_percent: u8,
}

impl StageEvent {
    pub fn new(job_id: JobId, stage: Stage, message: impl Into<String>, progress_percent: u8) -> Self {
        Self {
            job_id,
            stage,
            message: message.into(),
            progress_percent: progress_percent.min(100),
        }
    }

    /// Terminal failure event. Progress stays at the last completed stage.
    pub fn failed(job_id: JobId, message: impl Into<String>, last_progress: u8) -> Self {
        Self::new(job_id, Stage::Failed, message, last_progress)
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}
