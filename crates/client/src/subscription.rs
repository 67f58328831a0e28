//! Completion subscriptions and their release handles.
//!
//! [`GraphqlNotificationChannel`] opens one WebSocket operation per job
//! and spawns a task running [`process_frames`]. The returned
//! [`SubscriptionHandle`] owns that task: dropping the handle cancels it,
//! so a subscription can never outlive whoever holds it.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use docquery_core::types::JobId;

use crate::client::{send_frame, RealtimeClient};
use crate::documents::ON_ANALYTICS_JOB_COMPLETE;
use crate::events::ChannelEvent;
use crate::messages::{ClientFrame, StartPayload};
use crate::processor::process_frames;
use crate::service::NotificationChannel;

/// How long [`SubscriptionHandle::unsubscribe`] waits for the task to
/// send `stop` and close the socket.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors opening or running a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The channel could not be opened.
    #[error("{0}")]
    Setup(String),

    /// A protocol-level error on an established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Ownership of one open completion subscription.
///
/// Released explicitly with [`unsubscribe`](Self::unsubscribe), or
/// implicitly on drop.
#[derive(Debug)]
pub struct SubscriptionHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Wrap a spawned subscription task.
    pub fn new(job_id: JobId, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            job_id,
            cancel,
            task: Some(task),
        }
    }

    /// A handle with no task of its own; releasing it only cancels `cancel`.
    pub fn detached(job_id: JobId, cancel: CancellationToken) -> Self {
        Self {
            job_id,
            cancel,
            task: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_released(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the subscription and wait briefly for its task to finish.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(RELEASE_TIMEOUT, task).await.is_err() {
                tracing::warn!(job_id = %self.job_id, "Subscription task did not stop in time");
            }
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Completion notifications over GraphQL-over-WebSocket.
pub struct GraphqlNotificationChannel {
    client: RealtimeClient,
}

impl GraphqlNotificationChannel {
    pub fn new(client: RealtimeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationChannel for GraphqlNotificationChannel {
    async fn subscribe(
        &self,
        job_id: &str,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        let conn = self.client.connect().await?;
        let mut ws_stream = conn.ws_stream;

        let operation_id = uuid::Uuid::new_v4().to_string();
        let start = ClientFrame::Start {
            id: operation_id.clone(),
            payload: StartPayload {
                query: ON_ANALYTICS_JOB_COMPLETE.to_string(),
                variables: serde_json::json!({ "jobId": job_id }),
            },
        };
        send_frame(&mut ws_stream, &start)
            .await
            .map_err(|e| SubscriptionError::Setup(e.to_string()))?;

        tracing::info!(job_id = %job_id, operation_id = %operation_id, "Subscribed to job completion");

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_job_id = job_id.to_string();
        let task = tokio::spawn(async move {
            process_frames(ws_stream, operation_id, task_job_id, events, task_cancel).await;
        });

        Ok(SubscriptionHandle::new(job_id.to_string(), cancel, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_releases_handle() {
        let cancel = CancellationToken::new();
        let handle = SubscriptionHandle::detached("J1".into(), cancel.clone());
        assert!(!handle.is_released());
        drop(handle);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn unsubscribe_waits_for_task() {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { task_cancel.cancelled().await });
        let handle = SubscriptionHandle::new("J1".into(), cancel.clone(), task);

        handle.unsubscribe().await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn subscribe_to_unreachable_endpoint_is_setup_error() {
        let channel = GraphqlNotificationChannel::new(RealtimeClient::new(
            "ws://127.0.0.1:9".into(),
            None,
        ));
        let (tx, _rx) = mpsc::channel(1);
        let result = channel.subscribe("J1", tx).await;
        assert!(matches!(result, Err(SubscriptionError::Setup(_))));
    }
}
