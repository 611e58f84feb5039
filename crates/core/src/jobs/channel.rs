// crates/core/src/jobs/channel.rs
//! One remote observer's view of a job's stage events.
//!
//! A channel is `Attached` from creation until its single transition to
//! `Detached`, triggered by whichever comes first: an external disconnect,
//! the close policy reacting to a terminal event, or the channel being
//! dropped. The bus subscription is released exactly once on that
//! transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

use super::bus::{EventBus, Subscription};
use super::types::{JobId, StageEvent};
use crate::error::SubscriptionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Attached,
    Detached,
}

/// What the channel does after forwarding a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosePolicy {
    /// Stay attached until the observer goes away.
    #[default]
    KeepOpen,
    /// Detach right after the terminal event is forwarded.
    CloseOnTerminal,
}

struct Attachment {
    job_id: JobId,
    bus: Arc<EventBus>,
    subscription: Mutex<Option<Subscription>>,
    detached: AtomicBool,
}

impl Attachment {
    /// Returns `true` only for the call that performed the transition.
    fn detach(&self) -> bool {
        if self.detached.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.release();
        metrics::gauge!("glassbox_live_channels").decrement(1.0);
        tracing::debug!(job_id = %self.job_id, "live status channel detached");
        true
    }

    fn release(&self) {
        let taken = match self.subscription.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(subscription) = taken {
            self.bus.unsubscribe(&subscription);
        }
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

/// Forwards a job's stage events to one observer, in arrival order.
pub struct LiveStatusChannel {
    attachment: Arc<Attachment>,
    rx: mpsc::UnboundedReceiver<StageEvent>,
}

impl LiveStatusChannel {
    /// Subscribe to `job_id` on `bus`. Only events published after this
    /// returns are guaranteed to arrive.
    pub fn attach(
        bus: Arc<EventBus>,
        job_id: JobId,
        policy: ClosePolicy,
    ) -> Result<Self, SubscriptionError> {
        let attachment = Arc::new(Attachment {
            job_id: job_id.clone(),
            bus: Arc::clone(&bus),
            subscription: Mutex::new(None),
            detached: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::unbounded_channel();

        // Weak: the bus owns this handler, the handler must not own the bus.
        let weak: Weak<Attachment> = Arc::downgrade(&attachment);
        let subscription = bus.subscribe(job_id.clone(), move |event: &StageEvent| {
            if tx.send(event.clone()).is_err() {
                return;
            }
            if event.is_terminal() && policy == ClosePolicy::CloseOnTerminal {
                if let Some(attachment) = weak.upgrade() {
                    attachment.detach();
                }
            }
        })?;

        match attachment.subscription.lock() {
            Ok(mut slot) => *slot = Some(subscription),
            Err(poisoned) => *poisoned.into_inner() = Some(subscription),
        }
        metrics::gauge!("glassbox_live_channels").increment(1.0);
        tracing::debug!(job_id = %job_id, policy = ?policy, "live status channel attached");

        // A terminal event may have raced in before the handle was stored.
        if attachment.is_detached() {
            attachment.release();
        }

        Ok(Self { attachment, rx })
    }

    pub fn job_id(&self) -> &JobId {
        &self.attachment.job_id
    }

    pub fn state(&self) -> ChannelState {
        if self.attachment.is_detached() {
            ChannelState::Detached
        } else {
            ChannelState::Attached
        }
    }

    /// Next forwarded event. Once detached, drains what was already
    /// forwarded and then returns `None`.
    pub async fn recv(&mut self) -> Option<StageEvent> {
        if self.attachment.is_detached() {
            return self.rx.try_recv().ok();
        }
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<StageEvent> {
        self.rx.try_recv().ok()
    }

    /// External disconnect signal. Returns `true` if this call detached the
    /// channel, `false` if it was already detached.
    pub fn disconnect(&self) -> bool {
        self.attachment.detach()
    }
}

impl Drop for LiveStatusChannel {
    fn drop(&mut self) {
        self.attachment.detach();
    }
}
