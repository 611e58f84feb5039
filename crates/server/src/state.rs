// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use glassbox_core::{EventBus, JobDriver, JobId, JobRegistry, Scheduler, Sequencer, TokioScheduler};

use crate::auth::{AuthProvider, InMemoryAuthProvider};
use crate::config::Config;
use crate::documents::DocumentStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Base URL used when handing out upload and document links.
    pub public_url: String,
    pub registry: Arc<JobRegistry>,
    pub bus: Arc<EventBus>,
    pub driver: JobDriver,
    /// Session resolution for protected routes.
    pub auth: Arc<dyn AuthProvider>,
    /// The built-in identity provider, exposed for the mock login route.
    /// `None` unless dev auth is enabled.
    pub mock_idp: Option<Arc<InMemoryAuthProvider>>,
    /// Uploaded document bytes, keyed by job, within a memory budget.
    pub documents: DocumentStore,
}

impl AppState {
    /// Create state driven by real tokio timers.
    pub fn new(config: &Config) -> Arc<Self> {
        Self::with_scheduler(config, Arc::new(TokioScheduler))
    }

    /// Create state with a caller-supplied scheduler.
    pub fn with_scheduler(config: &Config, scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        let registry = Arc::new(JobRegistry::in_memory());
        let bus = Arc::new(EventBus::new());
        let driver = JobDriver::new(
            Arc::clone(&registry),
            Arc::clone(&bus),
            scheduler,
            Sequencer::new(config.stage_interval()),
        );

        // Without dev auth the provider still resolves tokens, but nothing
        // can mint them, so every protected route answers 401.
        let idp = Arc::new(InMemoryAuthProvider::new(config.dev_auth));
        let mock_idp = config.dev_auth.then(|| Arc::clone(&idp));

        Arc::new(Self {
            start_time: Instant::now(),
            public_url: config.public_url(),
            registry,
            bus,
            driver,
            auth: idp,
            mock_idp,
            documents: DocumentStore::new(config.max_documents, config.document_budget_bytes()),
        })
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn upload_url(&self, job_id: &JobId) -> String {
        format!("{}/api/upload/{}", self.public_url, job_id)
    }

    pub fn document_url(&self, job_id: &JobId) -> String {
        format!("{}/api/documents/{}/pdf", self.public_url, job_id)
    }
}
