//! Errors surfaced by the reconciler.
//!
//! The `Display` text of every variant here is exactly what gets written
//! into [`JobView::error`](crate::view::JobView::error).

use docquery_client::{AnalyticsApiError, SubscriptionError};
use docquery_core::error::CoreError;
use docquery_core::types::JobId;

/// Submitting a new query failed.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The service answered without a job record.
    #[error("Failed to create analytics job - received null response")]
    NullResponse,

    #[error("{}", message_or(.0, "Failed to submit query"))]
    Api(AnalyticsApiError),
}

/// An authoritative status lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("{}", message_or(.0, "Failed to fetch job status"))]
    Api(#[from] AnalyticsApiError),
}

/// A completion notification could not be turned into a job state.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    /// The signal was not a confirmation.
    #[error("Received invalid completion notification")]
    InvalidNotification,

    /// The follow-up fetch returned no record.
    #[error("Failed to fetch job details after completion")]
    NotFound,

    #[error("Failed to fetch job details: {}", message_or(.0, "Unknown error"))]
    Fetch(AnalyticsApiError),
}

/// Failures of the notification channel itself.
#[derive(Debug, thiserror::Error)]
pub enum ChannelFailure {
    /// The subscription could not be opened.
    #[error("Failed to set up job status subscription: {0}")]
    Setup(SubscriptionError),

    /// The open subscription reported an error.
    #[error("Subscription error: {0}")]
    Channel(String),
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// The error's own message, or `fallback` when it renders empty.
fn message_or(error: &AnalyticsApiError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
