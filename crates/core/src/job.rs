//! Analytics job records as reported by the remote job service.
//!
//! Two shapes come back over the wire: [`SubmittedJob`] from the submit
//! mutation, and [`JobRecord`] from every status fetch. The status fetch
//! is the only authoritative source for result, error and agent messages.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Message used when a job is FAILED but the service sent no error text.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Job processing failed";

/// Lifecycle status of an analytics job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// COMPLETED or FAILED. No further transitions are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// PENDING or PROCESSING. The fallback poll runs only in these states.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of the submit mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub query: String,
    pub created_at: Timestamp,
}

/// Response of the status fetch query.
///
/// `result` and `agent_messages` are JSON documents encoded as strings;
/// see [`AnalyticsResult`](crate::result::AnalyticsResult) and
/// [`AgentMessage`](crate::agent_messages::AgentMessage) for decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(default)]
    pub job_id: Option<JobId>,
    pub status: JobStatus,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "agent_messages")]
    pub agent_messages: Option<String>,
}

impl JobRecord {
    /// A bare record carrying only a status.
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            job_id: None,
            status,
            query: None,
            created_at: None,
            completed_at: None,
            result: None,
            error: None,
            agent_messages: None,
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_agent_messages(mut self, agent_messages: impl Into<String>) -> Self {
        self.agent_messages = Some(agent_messages.into());
        self
    }

    /// The error text to show for a FAILED job.
    ///
    /// Empty strings count as absent.
    pub fn failure_message(&self) -> String {
        match self.error.as_deref() {
            Some(e) if !e.trim().is_empty() => e.to_string(),
            _ => DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Reject blank queries before they reach the remote service.
pub fn validate_query(query: &str) -> Result<&str, CoreError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Query must not be empty".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Processing.is_active());
    }

    #[test]
    fn status_serializes_screaming_case() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let parsed: JobStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(parsed, JobStatus::Failed);
        assert_eq!(JobStatus::Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn parse_submitted_job() {
        let json = r#"{"jobId":"J1","status":"PENDING","query":"find invoices","createdAt":"2025-03-01T10:00:00.123456Z"}"#;
        let job: SubmittedJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.job_id, "J1");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.query, "find invoices");
    }

    #[test]
    fn parse_record_with_optional_fields_missing() {
        let json = r#"{"status":"PROCESSING"}"#;
        let record: JobRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, JobRecord::with_status(JobStatus::Processing));
    }

    #[test]
    fn parse_record_with_snake_case_agent_messages() {
        let json = r#"{"jobId":"J1","status":"COMPLETED","result":"42 invoices","agent_messages":"[]","completedAt":null}"#;
        let record: JobRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.result.as_deref(), Some("42 invoices"));
        assert_eq!(record.agent_messages.as_deref(), Some("[]"));
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn failure_message_falls_back_when_blank() {
        let record = JobRecord::with_status(JobStatus::Failed);
        assert_eq!(record.failure_message(), DEFAULT_FAILURE_MESSAGE);
        let record = record.with_error("  ");
        assert_eq!(record.failure_message(), DEFAULT_FAILURE_MESSAGE);
        let record = JobRecord::with_status(JobStatus::Failed).with_error("table not found");
        assert_eq!(record.failure_message(), "table not found");
    }

    #[test]
    fn blank_query_rejected() {
        assert_matches!(validate_query("   "), Err(CoreError::Validation(_)));
        assert_eq!(validate_query("  find invoices ").unwrap(), "find invoices");
    }
}
