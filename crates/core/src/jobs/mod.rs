// crates/core/src/jobs/mod.rs
//! Job lifecycle tracking.
//!
//! Provides:
//! - `JobRegistry`: job id to metadata, backed by a `RecordStore`
//! - `Sequencer`: scripted stage plans per scenario
//! - `EventBus`: per-job publish/subscribe of stage events
//! - `JobDriver`: walks one job through its plan on a `Scheduler`
//! - `LiveStatusChannel`: one observer's attached/detached subscription

pub mod bus;
pub mod channel;
pub mod driver;
pub mod registry;
pub mod scheduler;
pub mod sequencer;
pub mod types;

pub use bus::{EventBus, Handler, Subscription};
pub use channel::{ChannelState, ClosePolicy, LiveStatusChannel};
pub use driver::JobDriver;
pub use registry::{JobRegistry, MemoryStore, RecordStore};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
pub use sequencer::{Scenario, Sequencer, StageSpec};
pub use types::{JobId, JobMetadata, Stage, StageEvent};
