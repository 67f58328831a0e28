//! Shared fakes for reconciler integration tests.
//!
//! [`FakeApi`] replays scripted responses; [`FakeChannel`] records
//! subscriptions and lets a test fire notifications into them.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use docquery_client::{
    AnalyticsApiError, ChannelEvent, JobApi, NotificationChannel, SubscriptionError,
    SubscriptionHandle,
};
use docquery_core::job::{JobRecord, JobStatus, SubmittedJob};
use docquery_reconciler::{Reconciler, ReconcilerConfig};

// ---------------------------------------------------------------------------
// Scripted job API
// ---------------------------------------------------------------------------

/// One scripted answer from the fake service.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Found(T),
    Missing,
    Fail(String),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<Option<T>, AnalyticsApiError> {
        match self {
            Reply::Found(value) => Ok(Some(value)),
            Reply::Missing => Ok(None),
            Reply::Fail(message) => Err(AnalyticsApiError::GraphQl(message)),
        }
    }
}

/// Job API that replays scripted replies.
///
/// Status replies are queued per job; the last one repeats once the queue
/// is down to a single entry.
#[derive(Default)]
pub struct FakeApi {
    submissions: Mutex<VecDeque<Reply<SubmittedJob>>>,
    statuses: Mutex<HashMap<String, VecDeque<Reply<JobRecord>>>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_submit(&self, reply: Reply<SubmittedJob>) {
        self.submissions.lock().unwrap().push_back(reply);
    }

    pub fn accept(&self, job_id: &str, query: &str) {
        self.push_submit(Reply::Found(submitted(job_id, query, JobStatus::Pending)));
    }

    /// Replace the script for `job_id`.
    pub fn set_status(&self, job_id: &str, reply: Reply<JobRecord>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(job_id.to_string(), VecDeque::from([reply]));
    }

    pub fn queue_status(&self, job_id: &str, reply: Reply<JobRecord>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn fetch_count(&self, job_id: &str) -> usize {
        self.fetches.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl JobApi for FakeApi {
    async fn submit_query(&self, _query: &str) -> Result<Option<SubmittedJob>, AnalyticsApiError> {
        let reply = self
            .submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail("no scripted submission".into()));
        reply.into_result()
    }

    async fn get_job_status(&self, job_id: &str) -> Result<Option<JobRecord>, AnalyticsApiError> {
        *self.fetches.lock().unwrap().entry(job_id.to_string()).or_default() += 1;

        let mut statuses = self.statuses.lock().unwrap();
        let reply = match statuses.get_mut(job_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        reply.unwrap_or(Reply::Missing).into_result()
    }
}

// ---------------------------------------------------------------------------
// Recording notification channel
// ---------------------------------------------------------------------------

struct Subscription {
    job_id: String,
    events: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
}

/// Notification channel that records every subscription.
#[derive(Default)]
pub struct FakeChannel {
    subscriptions: Mutex<Vec<Subscription>>,
    fail_next: Mutex<Option<String>>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `subscribe` call fail with `message`.
    pub fn fail_next_subscribe(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    /// Job ids in subscription order.
    pub fn subscribed_jobs(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.job_id.clone())
            .collect()
    }

    /// Whether the latest subscription for `job_id` has been released.
    pub fn is_released(&self, job_id: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.job_id == job_id)
            .map(|s| s.cancel.is_cancelled())
            .unwrap_or(false)
    }

    /// Deliver a completion signal on the latest subscription for `job_id`.
    pub async fn notify(&self, job_id: &str, confirmed: bool) {
        self.send(ChannelEvent::Notified {
            job_id: job_id.to_string(),
            confirmed,
        })
        .await;
    }

    /// Deliver a channel error on the latest subscription for `job_id`.
    pub async fn fail(&self, job_id: &str, message: &str) {
        self.send(ChannelEvent::Error {
            job_id: job_id.to_string(),
            message: message.to_string(),
        })
        .await;
    }

    async fn send(&self, event: ChannelEvent) {
        let sender = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.job_id == event.job_id())
            .map(|s| s.events.clone())
            .expect("no subscription for job");
        sender.send(event).await.expect("reconciler receiver dropped");
    }
}

#[async_trait]
impl NotificationChannel for FakeChannel {
    async fn subscribe(
        &self,
        job_id: &str,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(SubscriptionError::Setup(message));
        }

        let cancel = CancellationToken::new();
        self.subscriptions.lock().unwrap().push(Subscription {
            job_id: job_id.to_string(),
            events,
            cancel: cancel.clone(),
        });
        Ok(SubscriptionHandle::detached(job_id.to_string(), cancel))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub type TestReconciler = Reconciler<FakeApi, FakeChannel>;

pub fn submitted(job_id: &str, query: &str, status: JobStatus) -> SubmittedJob {
    SubmittedJob {
        job_id: job_id.to_string(),
        status,
        query: query.to_string(),
        created_at: chrono::Utc::now(),
    }
}

pub fn record(job_id: &str, status: JobStatus) -> JobRecord {
    JobRecord {
        job_id: Some(job_id.to_string()),
        ..JobRecord::with_status(status)
    }
}

/// A reconciler on the default 1 s timings, plus handles to its fakes.
pub fn reconciler() -> (TestReconciler, Arc<FakeApi>, Arc<FakeChannel>) {
    let api = FakeApi::new();
    let channel = FakeChannel::new();
    let reconciler = Reconciler::new(api.clone(), channel.clone(), ReconcilerConfig::default());
    (reconciler, api, channel)
}

/// Receive and merge one event.
pub async fn step(reconciler: &mut TestReconciler) {
    let event = reconciler.next_event().await.expect("event loop closed");
    reconciler.handle_event(event).await;
}

/// Merge every event that arrives within `window` of simulated time.
pub async fn drain(reconciler: &mut TestReconciler, window: Duration) {
    while let Ok(Some(event)) = tokio::time::timeout(window, reconciler.next_event()).await {
        reconciler.handle_event(event).await;
    }
}
