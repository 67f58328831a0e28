//! GraphQL operation documents for the analytics job service.

/// Create a job for a natural-language query.
pub const SUBMIT_ANALYTICS_QUERY: &str = r#"
  query SubmitAnalyticsQuery($query: String!) {
    submitAnalyticsQuery(query: $query) {
      jobId
      status
      query
      createdAt
    }
  }
"#;

/// Fetch the authoritative state of a job.
pub const GET_ANALYTICS_JOB_STATUS: &str = r#"
  query GetAnalyticsJobStatus($jobId: ID!) {
    getAnalyticsJobStatus(jobId: $jobId) {
      jobId
      status
      query
      createdAt
      completedAt
      result
      error
      agent_messages
    }
  }
"#;

/// Fires once, with a boolean, when the job reaches a terminal state.
pub const ON_ANALYTICS_JOB_COMPLETE: &str = r#"
  subscription OnAnalyticsJobComplete($jobId: ID!) {
    onAnalyticsJobComplete(jobId: $jobId)
  }
"#;

/// Response field names, matching the operations above.
pub const SUBMIT_FIELD: &str = "submitAnalyticsQuery";
pub const STATUS_FIELD: &str = "getAnalyticsJobStatus";
pub const COMPLETE_FIELD: &str = "onAnalyticsJobComplete";
