// crates/core/src/error.rs
use thiserror::Error;

use crate::jobs::JobId;

/// Errors raised by the job registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Job already registered: {job_id}")]
    DuplicateJob { job_id: JobId },
}

/// Errors raised when starting a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("Unknown job: {job_id}")]
    UnknownJob { job_id: JobId },

    #[error("Job already started: {job_id}")]
    AlreadyStarted { job_id: JobId },
}

/// Errors raised by event bus subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("Event bus is shut down")]
    BusClosed,

    #[error("Subscription {id} is not active")]
    Released { id: u64 },
}

impl DriverError {
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::UnknownJob { job_id } | Self::AlreadyStarted { job_id } => job_id,
        }
    }
}
