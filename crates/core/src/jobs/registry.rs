// crates/core/src/jobs/registry.rs
//! Job registry: job id to metadata.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::types::{JobId, JobMetadata};
use crate::error::RegistryError;

/// Keyed storage behind the registry. May be memory or something durable.
pub trait RecordStore: Send + Sync {
    /// Store `metadata` under `job_id` unless the id is already taken.
    /// Returns `false` on collision, leaving the existing record untouched.
    fn put(&self, job_id: JobId, metadata: JobMetadata) -> bool;

    fn get(&self, job_id: &JobId) -> Option<JobMetadata>;
}

/// In-process record store. Entries vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<JobId, JobMetadata>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, job_id: JobId, metadata: JobMetadata) -> bool {
        match self.records.entry(job_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(metadata);
                true
            }
        }
    }

    fn get(&self, job_id: &JobId) -> Option<JobMetadata> {
        self.records.get(job_id).map(|r| r.value().clone())
    }
}

/// Maps job ids to the metadata needed to process them.
pub struct JobRegistry {
    store: Arc<dyn RecordStore>,
}

impl JobRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Registry backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Register a new job. Fails if the id is already present.
    pub fn create(&self, job_id: JobId, metadata: JobMetadata) -> Result<(), RegistryError> {
        if self.store.put(job_id.clone(), metadata) {
            tracing::debug!(job_id = %job_id, "job registered");
            Ok(())
        } else {
            Err(RegistryError::DuplicateJob { job_id })
        }
    }

    /// Look up a job's metadata. `None` for ids never registered.
    pub fn get(&self, job_id: &JobId) -> Option<JobMetadata> {
        self.store.get(job_id)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}
