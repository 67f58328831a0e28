//! Per-session resources: the active job, its subscription, and timers.
//!
//! Every resource is held through a guard whose `Drop` cancels the
//! underlying task, so replacing a field or dropping the [`Session`]
//! releases it on every exit path.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use docquery_client::SubscriptionHandle;
use docquery_core::types::JobId;

use crate::events::TimerEvent;

/// Smallest accepted poll period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Ownership of one spawned timer task.
#[derive(Debug)]
pub struct TimerGuard {
    cancel: CancellationToken,
    #[allow(dead_code)]
    task: JoinHandle<()>,
}

impl TimerGuard {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Explicit context for the single active job.
#[derive(Debug, Default)]
pub struct Session {
    active_job: Option<JobId>,
    subscription: Option<SubscriptionHandle>,
    immediate_check: Option<TimerGuard>,
    poll: Option<TimerGuard>,
}

impl Session {
    pub fn active_job(&self) -> Option<&str> {
        self.active_job.as_deref()
    }

    pub fn is_active_job(&self, job_id: &str) -> bool {
        self.active_job.as_deref() == Some(job_id)
    }

    /// Make `job_id` the active job. Resources of the previous job are
    /// released first.
    pub fn activate(&mut self, job_id: JobId) {
        self.teardown();
        self.active_job = Some(job_id);
    }

    pub fn set_subscription(&mut self, handle: SubscriptionHandle) {
        self.subscription = Some(handle);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| !s.is_released())
    }

    pub fn take_subscription(&mut self) -> Option<SubscriptionHandle> {
        self.subscription.take()
    }

    pub fn set_immediate_check(&mut self, guard: TimerGuard) {
        self.immediate_check = Some(guard);
    }

    /// Consume the pending one-shot check. Returns false when it was
    /// already consumed or cancelled.
    pub fn take_immediate_check(&mut self) -> bool {
        self.immediate_check.take().is_some()
    }

    pub fn set_poll(&mut self, guard: TimerGuard) {
        self.poll = Some(guard);
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.is_cancelled())
    }

    /// True while anything can still deliver an event for the active job.
    pub fn has_live_inputs(&self) -> bool {
        self.active_job.is_some()
            && (self.is_subscribed() || self.is_polling() || self.immediate_check.is_some())
    }

    /// Cancel both timers. The subscription stays open.
    pub fn stop_timers(&mut self) {
        self.immediate_check = None;
        self.poll = None;
    }

    /// Release everything and forget the active job.
    pub fn teardown(&mut self) {
        if let Some(job_id) = self.active_job.take() {
            tracing::debug!(job_id = %job_id, "Tearing down job session");
        }
        self.subscription = None;
        self.stop_timers();
    }
}

/// Spawn the one-shot check that fires once after `delay`.
pub fn spawn_immediate_check(
    job_id: JobId,
    delay: Duration,
    events: mpsc::Sender<TimerEvent>,
) -> TimerGuard {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        tokio::select! {
            _ = task_cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                tracing::debug!(job_id = %job_id, "Immediate status check due");
                let _ = events.send(TimerEvent::ImmediateCheckDue { job_id }).await;
            }
        }
    });

    TimerGuard { cancel, task }
}

/// Spawn the repeating poll. The first tick fires one `period` after
/// spawning; ticks continue until the guard is dropped.
pub fn spawn_poll(job_id: JobId, period: Duration, events: mpsc::Sender<TimerEvent>) -> TimerGuard {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let period = period.max(MIN_POLL_INTERVAL);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    tracing::debug!(job_id = %job_id, "Poll stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let event = TimerEvent::PollDue { job_id: job_id.clone() };
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    TimerGuard { cancel, task }
}
