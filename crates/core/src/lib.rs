// crates/core/src/lib.rs
//! GlassBox core: the document job lifecycle.
//!
//! A job is registered when an upload is announced, started once the bytes
//! arrive, and then walks a scripted sequence of processing stages. Every
//! stage transition is published on the [`EventBus`](jobs::EventBus) under
//! the job's id, where live status channels pick it up.

pub mod billing;
pub mod error;
pub mod jobs;

pub use billing::{BillingProfile, Evidence, EvidenceRect, LineItem};
pub use error::*;
pub use jobs::{
    ChannelState, ClosePolicy, EventBus, JobDriver, JobId, JobMetadata, JobRegistry,
    LiveStatusChannel, ManualScheduler, MemoryStore, RecordStore, Scenario, Scheduler,
    Sequencer, Stage, StageEvent, StageSpec, Subscription, TokioScheduler,
};
