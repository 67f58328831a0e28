//! Seams between the reconciler and the remote job service.
//!
//! The reconciler only ever talks to these two traits, so tests can
//! substitute scripted fakes for the HTTP and WebSocket transports.

use async_trait::async_trait;
use tokio::sync::mpsc;

use docquery_core::job::{JobRecord, SubmittedJob};

use crate::api::AnalyticsApiError;
use crate::events::ChannelEvent;
use crate::subscription::{SubscriptionError, SubscriptionHandle};

/// The remote job API: submission and authoritative status lookup.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Create a job. `Ok(None)` means the service returned no record.
    async fn submit_query(&self, query: &str) -> Result<Option<SubmittedJob>, AnalyticsApiError>;

    /// Fetch the current record. `Ok(None)` means no such job.
    async fn get_job_status(&self, job_id: &str) -> Result<Option<JobRecord>, AnalyticsApiError>;
}

/// The remote completion notification channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Open a completion subscription for `job_id`.
    ///
    /// Notifications and asynchronous channel errors are delivered on
    /// `events` until the returned handle is released or dropped.
    async fn subscribe(
        &self,
        job_id: &str,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Result<SubscriptionHandle, SubscriptionError>;
}
