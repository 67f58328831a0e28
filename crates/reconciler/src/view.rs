//! The visible job state and the rules for merging fetched records into it.
//!
//! Both update paths end here. [`apply_record`] is the authoritative
//! overwrite used after a notification or on resume; [`apply_poll`] is the
//! poll rule, which compares against the last known status so a no-op tick
//! only refreshes agent messages. Each returns the next view without
//! touching the previous one.

use docquery_core::agent_messages::AgentMessage;
use docquery_core::job::{JobRecord, JobStatus};
use docquery_core::result::AnalyticsResult;
use docquery_core::types::JobId;

/// Client-side view of the active analytics job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobView {
    pub query_text: String,
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    pub result: Option<AnalyticsResult>,
    pub agent_messages: Option<Vec<AgentMessage>>,
    pub error: Option<String>,
    pub is_submitting: bool,
}

impl JobView {
    /// True once a job is known and its status is COMPLETED or FAILED.
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }

    /// True while a job is known and still PENDING or PROCESSING.
    pub fn is_active(&self) -> bool {
        self.job_id.is_some() && self.status.is_some_and(JobStatus::is_active)
    }
}

/// What a poll tick did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The tick was not for the active job, or polling had stopped.
    Skipped,
    /// Same status; only agent messages were refreshed.
    Unchanged,
    /// Moved to another non-terminal status.
    Advanced(JobStatus),
    /// Reached COMPLETED or FAILED; polling stops.
    Terminal(JobStatus),
    /// The service returned no record.
    Missing,
    /// The fetch failed; logged and otherwise ignored.
    Failed,
}

/// Overwrite the view from an authoritative record.
///
/// Applying the same record twice yields the same view.
pub fn apply_record(view: &JobView, record: &JobRecord) -> JobView {
    warn_on_regression(view, record);

    let mut next = view.clone();
    next.status = Some(record.status);
    next.agent_messages = decode_messages(record);
    apply_terminal_fields(&mut next, record);
    next
}

/// Apply the poll rule against `last_known`.
///
/// Agent messages are always refreshed. Status and terminal fields are
/// written only when the status differs from `last_known`, so an
/// unchanged tick never clears a result or error already shown.
pub fn apply_poll(
    view: &JobView,
    last_known: Option<JobStatus>,
    record: &JobRecord,
) -> (JobView, PollOutcome) {
    let mut next = view.clone();
    next.agent_messages = decode_messages(record);

    if last_known == Some(record.status) {
        return (next, PollOutcome::Unchanged);
    }

    warn_on_regression(view, record);
    next.status = Some(record.status);
    apply_terminal_fields(&mut next, record);

    let outcome = if record.status.is_terminal() {
        PollOutcome::Terminal(record.status)
    } else {
        PollOutcome::Advanced(record.status)
    };
    (next, outcome)
}

fn apply_terminal_fields(view: &mut JobView, record: &JobRecord) {
    match record.status {
        JobStatus::Completed => {
            view.result = record.result.as_deref().map(AnalyticsResult::decode);
        }
        JobStatus::Failed => {
            view.error = Some(record.failure_message());
        }
        JobStatus::Pending | JobStatus::Processing => {}
    }
}

/// Decode the record's agent messages; undecodable lists become empty.
fn decode_messages(record: &JobRecord) -> Option<Vec<AgentMessage>> {
    let raw = record.agent_messages.as_deref()?;
    match AgentMessage::decode_list(raw) {
        Ok(messages) => Some(messages),
        Err(e) => {
            tracing::warn!(job_id = ?record.job_id, error = %e, "Ignoring malformed agent messages");
            Some(Vec::new())
        }
    }
}

/// The service is trusted to be monotonic; a terminal view moving back to
/// an active status means it returned a stale snapshot. Logged, not blocked.
fn warn_on_regression(view: &JobView, record: &JobRecord) {
    if view.is_terminal() && record.status.is_active() {
        tracing::warn!(
            job_id = ?view.job_id,
            from = ?view.status,
            to = %record.status,
            "Fetched status reverts a terminal job",
        );
    }
}
