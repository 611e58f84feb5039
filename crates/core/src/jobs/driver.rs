// crates/core/src/jobs/driver.rs
//! Walks a job through its stage plan.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::bus::EventBus;
use super::registry::JobRegistry;
use super::scheduler::Scheduler;
use super::sequencer::{Scenario, Sequencer, StageSpec};
use super::types::{JobId, StageEvent};
use crate::error::DriverError;

/// Starts jobs and publishes their stage transitions on the event bus.
///
/// The first stage is published before `start` returns. Each later stage is
/// a deferred task that publishes and then schedules its successor, so one
/// job's events are strictly ordered and different jobs never wait on each
/// other. The schedule runs whether or not anyone is subscribed.
pub struct JobDriver {
    registry: Arc<JobRegistry>,
    bus: Arc<EventBus>,
    scheduler: Arc<dyn Scheduler>,
    sequencer: Sequencer,
    /// Last published event per started job.
    statuses: Arc<DashMap<JobId, StageEvent>>,
}

impl JobDriver {
    pub fn new(
        registry: Arc<JobRegistry>,
        bus: Arc<EventBus>,
        scheduler: Arc<dyn Scheduler>,
        sequencer: Sequencer,
    ) -> Self {
        Self {
            registry,
            bus,
            scheduler,
            sequencer,
            statuses: Arc::new(DashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Start processing a registered job.
    ///
    /// Fails with `UnknownJob` if the id was never registered and with
    /// `AlreadyStarted` on any second call for the same id; neither case
    /// schedules anything.
    pub fn start(&self, job_id: &JobId) -> Result<Scenario, DriverError> {
        let metadata = self
            .registry
            .get(job_id)
            .ok_or_else(|| DriverError::UnknownJob {
                job_id: job_id.clone(),
            })?;

        let scenario = Sequencer::classify(&metadata);
        let mut stages = self.sequencer.plan(scenario).into_iter();
        let Some(first) = stages.next() else {
            return Ok(scenario);
        };

        match self.statuses.entry(job_id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(job_id = %job_id, "start rejected: job already started");
                return Err(DriverError::AlreadyStarted {
                    job_id: job_id.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(Run::event_for(job_id, &first));
            }
        }

        metrics::counter!("glassbox_jobs_started_total").increment(1);
        tracing::info!(
            job_id = %job_id,
            filename = %metadata.filename,
            scenario = ?scenario,
            interval_ms = self.sequencer.interval().as_millis() as u64,
            "job started"
        );

        let run = Run {
            job_id: job_id.clone(),
            bus: Arc::clone(&self.bus),
            scheduler: Arc::clone(&self.scheduler),
            statuses: Arc::clone(&self.statuses),
            stages,
        };
        run.emit(&first);
        if !first.stage.is_terminal() {
            run.advance(first.delay);
        }
        Ok(scenario)
    }

    /// The most recent event published for `job_id`, if it has started.
    pub fn status(&self, job_id: &JobId) -> Option<StageEvent> {
        self.statuses.get(job_id).map(|e| e.value().clone())
    }
}

/// The remaining schedule of one job.
struct Run {
    job_id: JobId,
    bus: Arc<EventBus>,
    scheduler: Arc<dyn Scheduler>,
    statuses: Arc<DashMap<JobId, StageEvent>>,
    stages: std::vec::IntoIter<StageSpec>,
}

impl Run {
    fn event_for(job_id: &JobId, spec: &StageSpec) -> StageEvent {
        StageEvent::new(
            job_id.clone(),
            spec.stage,
            spec.message,
            spec.progress_percent,
        )
    }

    fn emit(&self, spec: &StageSpec) {
        let event = Self::event_for(&self.job_id, spec);
        self.statuses.insert(self.job_id.clone(), event.clone());

        metrics::counter!("glassbox_stage_events_published_total", "stage" => spec.stage.as_str())
            .increment(1);
        let delivered = self.bus.publish(&self.job_id, &event);
        tracing::debug!(
            job_id = %self.job_id,
            stage = %spec.stage,
            progress = spec.progress_percent,
            delivered,
            "stage published"
        );
        if spec.stage.is_terminal() {
            tracing::info!(job_id = %self.job_id, stage = %spec.stage, "job finished");
        }
    }

    /// Schedule the next stage relative to `elapsed`, the offset of the
    /// stage just published.
    fn advance(mut self, elapsed: Duration) {
        let Some(spec) = self.stages.next() else {
            return;
        };
        let wait = spec.delay.saturating_sub(elapsed);
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.schedule(
            wait,
            Box::new(move || {
                self.emit(&spec);
                // Terminal stages end the sequence.
                if !spec.stage.is_terminal() {
                    self.advance(spec.delay);
                }
            }),
        );
    }
}
