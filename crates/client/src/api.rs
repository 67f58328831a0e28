//! GraphQL-over-HTTP client for the analytics job service.
//!
//! Wraps job submission and status lookup using [`reqwest`]. Both
//! operations return `Ok(None)` when the service answers with a `null`
//! record, which callers treat differently from transport failures.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use docquery_core::job::{JobRecord, SubmittedJob};

use crate::documents::{
    GET_ANALYTICS_JOB_STATUS, STATUS_FIELD, SUBMIT_ANALYTICS_QUERY, SUBMIT_FIELD,
};
use crate::service::JobApi;

/// HTTP client for one analytics GraphQL endpoint.
pub struct AnalyticsApi {
    client: reqwest::Client,
    api_url: String,
    auth_token: Option<String>,
}

/// Errors from the job API layer.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Analytics API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The GraphQL response carried an `errors` array.
    #[error("{0}")]
    GraphQl(String),

    /// The `data` field did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl AnalyticsApi {
    /// Create a new API client.
    ///
    /// * `api_url`    - GraphQL endpoint, e.g. `https://host/graphql`.
    /// * `auth_token` - sent verbatim as the `Authorization` header.
    pub fn new(api_url: String, auth_token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, auth_token)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, auth_token: Option<String>) -> Self {
        Self {
            client,
            api_url,
            auth_token,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Create a job for `query`.
    pub async fn submit_query(&self, query: &str) -> Result<Option<SubmittedJob>, AnalyticsApiError> {
        let variables = serde_json::json!({ "query": query });
        let job: Option<SubmittedJob> = self
            .execute(SUBMIT_ANALYTICS_QUERY, variables, SUBMIT_FIELD)
            .await?;

        tracing::debug!(job_id = ?job.as_ref().map(|j| &j.job_id), "Submit response received");
        Ok(job)
    }

    /// Fetch the current record for `job_id`.
    pub async fn get_job_status(&self, job_id: &str) -> Result<Option<JobRecord>, AnalyticsApiError> {
        let variables = serde_json::json!({ "jobId": job_id });
        self.execute(GET_ANALYTICS_JOB_STATUS, variables, STATUS_FIELD)
            .await
    }

    // ---- private helpers ----

    /// POST a GraphQL operation and extract `data.<field>`.
    async fn execute<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: serde_json::Value,
        field: &str,
    ) -> Result<Option<T>, AnalyticsApiError> {
        let body = serde_json::json!({
            "query": document,
            "variables": variables,
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = Self::ensure_success(request.send().await?).await?;
        let parsed: GraphQlResponse = response.json().await?;
        extract_field(parsed, field)
    }

    /// Return the response unchanged on success, or an
    /// [`AnalyticsApiError::ApiError`] with status and body otherwise.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AnalyticsApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AnalyticsApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Pull one field out of a GraphQL response envelope.
///
/// Errors take precedence over partial data.
fn extract_field<T: DeserializeOwned>(
    response: GraphQlResponse,
    field: &str,
) -> Result<Option<T>, AnalyticsApiError> {
    if !response.errors.is_empty() {
        let message = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AnalyticsApiError::GraphQl(message));
    }

    let value = response
        .data
        .and_then(|mut data| data.remove(field))
        .unwrap_or(serde_json::Value::Null);

    Ok(serde_json::from_value::<Option<T>>(value)?)
}

#[async_trait]
impl JobApi for AnalyticsApi {
    async fn submit_query(&self, query: &str) -> Result<Option<SubmittedJob>, AnalyticsApiError> {
        AnalyticsApi::submit_query(self, query).await
    }

    async fn get_job_status(&self, job_id: &str) -> Result<Option<JobRecord>, AnalyticsApiError> {
        AnalyticsApi::get_job_status(self, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use docquery_core::job::JobStatus;

    fn response(json: &str) -> GraphQlResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extract_submitted_job() {
        let resp = response(
            r#"{"data":{"submitAnalyticsQuery":{"jobId":"J1","status":"PENDING","query":"q","createdAt":"2025-03-01T10:00:00Z"}}}"#,
        );
        let job: Option<SubmittedJob> = extract_field(resp, SUBMIT_FIELD).unwrap();
        let job = job.expect("job present");
        assert_eq!(job.job_id, "J1");
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn null_field_is_none() {
        let resp = response(r#"{"data":{"getAnalyticsJobStatus":null}}"#);
        let record: Option<JobRecord> = extract_field(resp, STATUS_FIELD).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn missing_data_is_none() {
        let resp = response(r#"{}"#);
        let record: Option<JobRecord> = extract_field(resp, STATUS_FIELD).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn errors_are_joined() {
        let resp = response(
            r#"{"data":null,"errors":[{"message":"Unauthorized"},{"message":"Not allowed"}]}"#,
        );
        let err = extract_field::<JobRecord>(resp, STATUS_FIELD).unwrap_err();
        assert_matches!(&err, AnalyticsApiError::GraphQl(_));
        assert_eq!(err.to_string(), "Unauthorized; Not allowed");
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let resp = response(r#"{"data":{"getAnalyticsJobStatus":{"status":"UNKNOWN"}}}"#);
        assert_matches!(
            extract_field::<JobRecord>(resp, STATUS_FIELD),
            Err(AnalyticsApiError::Decode(_))
        );
    }
}
