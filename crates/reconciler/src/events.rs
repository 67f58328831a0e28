//! Inputs to the reconciler's event loop.

use docquery_client::ChannelEvent;
use docquery_core::types::JobId;

/// Signals from the session's timer tasks. They carry no data: the loop
/// performs the fetch itself when it handles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// The one-shot check scheduled after submission is due.
    ImmediateCheckDue { job_id: JobId },
    /// A repeating poll tick is due.
    PollDue { job_id: JobId },
}

impl TimerEvent {
    pub fn job_id(&self) -> &str {
        match self {
            TimerEvent::ImmediateCheckDue { job_id } | TimerEvent::PollDue { job_id } => job_id,
        }
    }
}

/// Everything the loop can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerEvent {
    Channel(ChannelEvent),
    Timer(TimerEvent),
}

impl ReconcilerEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ReconcilerEvent::Channel(e) => e.job_id(),
            ReconcilerEvent::Timer(e) => e.job_id(),
        }
    }
}

/// Which path delivered a fetched record. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Notification,
    ImmediateCheck,
    Poll,
    Resume,
}
