// crates/core/src/jobs/sequencer.rs
//! Scripted stage plans.
//!
//! There is no real document processing: each job is classified into one of
//! two scenarios and replays that scenario's fixed stage table. Everything
//! here is a pure function of the classification.

use std::time::Duration;

use serde::Serialize;

use super::types::{JobMetadata, Stage};

/// Filename that selects the clean scenario. Anything else is degraded.
pub const CLEAN_FILENAME: &str = "test.pdf";

/// Default gap between consecutive stages.
pub const DEFAULT_STAGE_INTERVAL: Duration = Duration::from_secs(4);

/// Which scripted lifecycle a job replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Every stage succeeds without warnings.
    Clean,
    /// Same schedule, but the invoice date is reported missing and date
    /// validation is skipped. Still ends in `Completed`.
    Degraded,
}

/// One planned stage transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub stage: Stage,
    pub message: &'static str,
    pub progress_percent: u8,
    /// Offset from the job's start.
    pub delay: Duration,
}

const CLEAN_SCRIPT: [(Stage, &str, u8); 5] = [
    (Stage::Uploaded, "PDF uploaded.", 10),
    (Stage::OcrProcessing, "Running OCR...", 30),
    (Stage::EntityExtraction, "Extracting medical entities...", 60),
    (Stage::RuleApplication, "Applying GOÄ billing rules...", 80),
    (Stage::Completed, "Billing proposal ready.", 100),
];

const DEGRADED_SCRIPT: [(Stage, &str, u8); 5] = [
    (Stage::Uploaded, "PDF uploaded.", 10),
    (Stage::OcrProcessing, "Running OCR...", 30),
    (
        Stage::EntityExtraction,
        "Warning: invoice date is missing or illegible.",
        60,
    ),
    (Stage::RuleApplication, "Skipping date validation...", 80),
    (Stage::Completed, "Processing finished (with warnings).", 100),
];

/// Produces stage plans. The interval scales every delay in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequencer {
    interval: Duration,
}

impl Sequencer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pick the scenario for a job.
    pub fn classify(metadata: &JobMetadata) -> Scenario {
        if metadata.filename == CLEAN_FILENAME {
            Scenario::Clean
        } else {
            Scenario::Degraded
        }
    }

    /// The ordered stages for `scenario`. The first stage has zero delay and
    /// the last one is terminal.
    pub fn plan(&self, scenario: Scenario) -> Vec<StageSpec> {
        let script = match scenario {
            Scenario::Clean => &CLEAN_SCRIPT,
            Scenario::Degraded => &DEGRADED_SCRIPT,
        };
        script
            .iter()
            .zip(0u32..)
            .map(|(&(stage, message, progress_percent), step)| StageSpec {
                stage,
                message,
                progress_percent,
                delay: self.interval * step,
            })
            .collect()
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_INTERVAL)
    }
}
