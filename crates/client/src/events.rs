//! Events emitted by a completion subscription.
//!
//! These are produced by the subscription task after interpreting raw
//! WebSocket frames and consumed by the reconciler's event loop.

use docquery_core::types::JobId;

/// A signal from the notification channel for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The completion subscription fired.
    ///
    /// `confirmed` is the boolean the service sent; anything other than
    /// `true` is not a valid completion signal.
    Notified { job_id: JobId, confirmed: bool },

    /// The channel reported an error after it was established.
    Error { job_id: JobId, message: String },
}

impl ChannelEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ChannelEvent::Notified { job_id, .. } | ChannelEvent::Error { job_id, .. } => job_id,
        }
    }
}
