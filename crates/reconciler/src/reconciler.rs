//! The job status reconciler.
//!
//! [`Reconciler`] owns the [`Session`] and the published [`JobView`]. All
//! inputs (completion notifications, channel errors, timer ticks) arrive
//! as [`ReconcilerEvent`]s on one loop; [`Reconciler::handle_event`] is
//! the only place they are merged into the view, so concurrent channels
//! never interleave inside a single update.
//!
//! View updates are full-state replacements published on a
//! [`tokio::sync::watch`] channel. Call [`Reconciler::watch`] to observe
//! them.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use docquery_client::{ChannelEvent, JobApi, NotificationChannel};
use docquery_core::job::{validate_query, JobRecord, JobStatus};

use crate::config::ReconcilerConfig;
use crate::error::{ChannelFailure, FetchError, ReconciliationError, SubmissionError};
use crate::events::{ReconcilerEvent, TimerEvent, UpdateSource};
use crate::session::{spawn_immediate_check, spawn_poll, Session};
use crate::view::{apply_poll, apply_record, JobView, PollOutcome};

/// Channel capacity for subscription and timer events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Merges push and poll updates for one active job into a single view.
pub struct Reconciler<A, N> {
    api: Arc<A>,
    channel: Arc<N>,
    config: ReconcilerConfig,
    session: Session,
    view_tx: watch::Sender<JobView>,
    channel_tx: mpsc::Sender<ChannelEvent>,
    channel_rx: mpsc::Receiver<ChannelEvent>,
    timer_tx: mpsc::Sender<TimerEvent>,
    timer_rx: mpsc::Receiver<TimerEvent>,
}

impl<A, N> Reconciler<A, N>
where
    A: JobApi,
    N: NotificationChannel,
{
    pub fn new(api: Arc<A>, channel: Arc<N>, config: ReconcilerConfig) -> Self {
        let (view_tx, _) = watch::channel(JobView::default());
        let (channel_tx, channel_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (timer_tx, timer_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            api,
            channel,
            config,
            session: Session::default(),
            view_tx,
            channel_tx,
            channel_rx,
            timer_tx,
            timer_rx,
        }
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> JobView {
        self.view_tx.borrow().clone()
    }

    /// Subscribe to view replacements.
    pub fn watch(&self) -> watch::Receiver<JobView> {
        self.view_tx.subscribe()
    }

    pub fn active_job_id(&self) -> Option<&str> {
        self.session.active_job()
    }

    pub fn is_subscribed(&self) -> bool {
        self.session.is_subscribed()
    }

    pub fn is_polling(&self) -> bool {
        self.session.is_polling()
    }

    /// Submit a new query and start tracking the resulting job.
    ///
    /// The previous job's subscription and timers are released first. On
    /// success a completion subscription is opened, one immediate check
    /// is scheduled, and the fallback poll starts. A job that is already
    /// terminal gets one status fetch instead of the timers. On failure,
    /// including a blank query, the view shows FAILED with the error
    /// message.
    pub async fn submit(&mut self, query: &str) -> Result<JobView, SubmissionError> {
        let query = match validate_query(query) {
            Ok(query) => query,
            Err(e) => {
                self.session.teardown();
                return Err(self.fail_submission(e.into()));
            }
        };

        self.session.teardown();
        self.update(|v| {
            v.query_text = query.to_string();
            v.is_submitting = true;
            v.result = None;
            v.agent_messages = None;
            v.error = None;
        });

        tracing::info!(query = %query, "Submitting analytics query");

        let submitted = match self.api.submit_query(query).await {
            Ok(Some(job)) => job,
            Ok(None) => return Err(self.fail_submission(SubmissionError::NullResponse)),
            Err(e) => return Err(self.fail_submission(SubmissionError::Api(e))),
        };

        let job_id = submitted.job_id.clone();
        tracing::info!(job_id = %job_id, status = %submitted.status, "Analytics job created");

        self.session.activate(job_id.clone());
        self.update(|v| {
            v.job_id = Some(job_id.clone());
            v.status = Some(submitted.status);
        });

        self.open_subscription(&job_id).await;
        if submitted.status.is_active() {
            self.session.set_immediate_check(spawn_immediate_check(
                job_id.clone(),
                self.config.immediate_check_delay,
                self.timer_tx.clone(),
            ));
            self.start_poll(&job_id);
        } else {
            self.fetch_settled(&job_id).await;
        }

        self.update(|v| v.is_submitting = false);
        Ok(self.view())
    }

    /// Start tracking a previously known job.
    ///
    /// A terminal job is shown as-is with no subscription. A non-terminal
    /// job gets a completion subscription, and merging its record starts
    /// the fallback poll.
    pub async fn resume_job(&mut self, job_id: &str) -> Result<JobView, FetchError> {
        tracing::info!(job_id = %job_id, "Resuming analytics job");

        self.session.activate(job_id.to_string());
        self.update(|v| {
            v.job_id = Some(job_id.to_string());
            v.status = None;
            v.result = None;
            v.agent_messages = None;
            v.error = None;
        });

        let record = match self.api.get_job_status(job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(self.fail_resume(FetchError::NotFound(job_id.to_string()))),
            Err(e) => return Err(self.fail_resume(FetchError::Api(e))),
        };

        self.merge_record(&record, UpdateSource::Resume);
        if let Some(query) = &record.query {
            self.update(|v| v.query_text = query.clone());
        }

        if record.status.is_active() {
            self.open_subscription(job_id).await;
        }

        Ok(self.view())
    }

    /// Handle a completion signal for `job_id`.
    ///
    /// The signal carries no state; one authoritative fetch is made and
    /// applied. Failures are written into the view and returned, never
    /// retried.
    pub async fn on_notification(
        &mut self,
        job_id: &str,
        confirmed: bool,
    ) -> Result<(), ReconciliationError> {
        if !self.session.is_active_job(job_id) {
            tracing::debug!(job_id = %job_id, "Ignoring notification for inactive job");
            return Ok(());
        }

        if !confirmed {
            return Err(self.fail_reconciliation(job_id, ReconciliationError::InvalidNotification));
        }

        tracing::debug!(job_id = %job_id, "Fetching job details after completion notification");
        match self.api.get_job_status(job_id).await {
            Ok(Some(record)) => {
                self.merge_record(&record, UpdateSource::Notification);
                Ok(())
            }
            Ok(None) => Err(self.fail_reconciliation(job_id, ReconciliationError::NotFound)),
            Err(e) => Err(self.fail_reconciliation(job_id, ReconciliationError::Fetch(e))),
        }
    }

    /// Run one poll against `last_known`.
    ///
    /// Fetch errors are logged and swallowed so they cannot override state
    /// established by the notification path.
    pub async fn poll_tick(
        &mut self,
        job_id: &str,
        last_known: Option<JobStatus>,
        source: UpdateSource,
    ) -> PollOutcome {
        if !self.session.is_active_job(job_id) {
            return PollOutcome::Skipped;
        }

        match self.api.get_job_status(job_id).await {
            Ok(Some(record)) => {
                // The fetch may have raced a teardown.
                if !self.session.is_active_job(job_id) {
                    return PollOutcome::Skipped;
                }
                let (next, outcome) = apply_poll(&self.view(), last_known, &record);
                self.view_tx.send_replace(next);

                match outcome {
                    PollOutcome::Terminal(status) => {
                        tracing::info!(job_id = %job_id, %status, ?source, "Job reached terminal state");
                        self.session.stop_timers();
                    }
                    PollOutcome::Advanced(status) => {
                        tracing::debug!(job_id = %job_id, %status, ?source, "Job status changed");
                        self.restart_poll_if_active();
                    }
                    _ => {}
                }
                outcome
            }
            Ok(None) => {
                tracing::debug!(job_id = %job_id, ?source, "Status check returned no record");
                PollOutcome::Missing
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, ?source, "Error polling job status");
                PollOutcome::Failed
            }
        }
    }

    /// Record an asynchronous error reported by the open subscription.
    pub fn on_channel_error(&mut self, job_id: &str, message: String) {
        if !self.session.is_active_job(job_id) {
            tracing::debug!(job_id = %job_id, "Ignoring channel error for inactive job");
            return;
        }
        let failure = ChannelFailure::Channel(message);
        tracing::error!(job_id = %job_id, error = %failure, "Subscription error");
        self.update(|v| v.error = Some(failure.to_string()));
    }

    /// Merge one event into the view.
    ///
    /// Events for a job other than the active one are discarded, as are
    /// timer ticks whose timer has already been stopped.
    pub async fn handle_event(&mut self, event: ReconcilerEvent) {
        if !self.session.is_active_job(event.job_id()) {
            tracing::debug!(job_id = %event.job_id(), ?event, "Discarding stale event");
            return;
        }

        match event {
            ReconcilerEvent::Channel(ChannelEvent::Notified { job_id, confirmed }) => {
                if let Err(e) = self.on_notification(&job_id, confirmed).await {
                    tracing::error!(job_id = %job_id, error = %e, "Completion notification not applied");
                }
            }
            ReconcilerEvent::Channel(ChannelEvent::Error { job_id, message }) => {
                self.on_channel_error(&job_id, message);
            }
            ReconcilerEvent::Timer(TimerEvent::ImmediateCheckDue { job_id }) => {
                if self.session.take_immediate_check() {
                    let last_known = self.view().status;
                    self.poll_tick(&job_id, last_known, UpdateSource::ImmediateCheck)
                        .await;
                }
            }
            ReconcilerEvent::Timer(TimerEvent::PollDue { job_id }) => {
                let view = self.view();
                if self.session.is_polling() && view.is_active() {
                    self.poll_tick(&job_id, view.status, UpdateSource::Poll).await;
                }
            }
        }
    }

    /// Wait for the next subscription or timer event.
    ///
    /// Returns `None` once the session holds no subscription or timer, since
    /// nothing could deliver an event for the active job any more.
    pub async fn next_event(&mut self) -> Option<ReconcilerEvent> {
        if !self.session.has_live_inputs() {
            return None;
        }
        tokio::select! {
            Some(event) = self.channel_rx.recv() => Some(ReconcilerEvent::Channel(event)),
            Some(event) = self.timer_rx.recv() => Some(ReconcilerEvent::Timer(event)),
            else => None,
        }
    }

    /// Drive the loop until the active job is no longer PENDING or
    /// PROCESSING, or until its inputs are gone (after a teardown).
    /// Returns the final view.
    pub async fn run_until_settled(&mut self) -> JobView {
        while self.view().is_active() {
            match self.next_event().await {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
        self.view()
    }

    /// Release the subscription and timers and forget the active job.
    /// The view keeps its last state.
    pub fn teardown(&mut self) {
        self.session.teardown();
    }

    /// Like [`teardown`](Self::teardown), but waits for the subscription
    /// task to close its connection.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.session.take_subscription() {
            handle.unsubscribe().await;
        }
        self.session.teardown();
    }

    // ---- private helpers ----

    /// Replace the published view with a modified copy.
    fn update(&self, f: impl FnOnce(&mut JobView)) {
        let mut next = self.view();
        f(&mut next);
        self.view_tx.send_replace(next);
    }

    /// Apply an authoritative record. Timers stop once terminal and run
    /// again whenever the view is back to PENDING or PROCESSING.
    fn merge_record(&mut self, record: &JobRecord, source: UpdateSource) {
        let next = apply_record(&self.view(), record);
        self.view_tx.send_replace(next);

        if record.status.is_terminal() {
            tracing::info!(status = %record.status, ?source, "Job reached terminal state");
            self.session.stop_timers();
        } else {
            self.restart_poll_if_active();
        }
    }

    /// Start the poll for the active job if the view needs one and none
    /// is running.
    fn restart_poll_if_active(&mut self) {
        let view = self.view();
        if !view.is_active() || self.session.is_polling() {
            return;
        }
        let Some(job_id) = self.session.active_job().map(str::to_string) else {
            return;
        };
        if view.job_id.as_deref() != Some(job_id.as_str()) {
            return;
        }
        tracing::debug!(job_id = %job_id, status = ?view.status, "Starting status poll");
        self.start_poll(&job_id);
    }

    /// One status fetch for a job that was already terminal when submitted.
    async fn fetch_settled(&mut self, job_id: &str) {
        match self.api.get_job_status(job_id).await {
            Ok(Some(record)) => self.merge_record(&record, UpdateSource::ImmediateCheck),
            Ok(None) => {
                tracing::warn!(job_id = %job_id, "No record for job that was submitted as terminal");
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Error fetching terminal job");
            }
        }
    }

    async fn open_subscription(&mut self, job_id: &str) {
        match self.channel.subscribe(job_id, self.channel_tx.clone()).await {
            Ok(handle) => self.session.set_subscription(handle),
            Err(e) => {
                let failure = ChannelFailure::Setup(e);
                tracing::error!(job_id = %job_id, error = %failure, "Error setting up subscription");
                self.update(|v| v.error = Some(failure.to_string()));
            }
        }
    }

    fn start_poll(&mut self, job_id: &str) {
        self.session.set_poll(spawn_poll(
            job_id.to_string(),
            self.config.poll_interval,
            self.timer_tx.clone(),
        ));
    }

    fn fail_submission(&mut self, error: SubmissionError) -> SubmissionError {
        tracing::error!(error = %error, "Error submitting query");
        self.update(|v| {
            v.error = Some(error.to_string());
            v.status = Some(JobStatus::Failed);
            v.is_submitting = false;
        });
        error
    }

    fn fail_resume(&mut self, error: FetchError) -> FetchError {
        tracing::error!(error = %error, "Error resuming job");
        self.session.teardown();
        self.update(|v| {
            v.error = Some(error.to_string());
            v.status = Some(JobStatus::Failed);
        });
        error
    }

    fn fail_reconciliation(
        &mut self,
        job_id: &str,
        error: ReconciliationError,
    ) -> ReconciliationError {
        tracing::error!(job_id = %job_id, error = %error, "Error reconciling completion notification");
        self.update(|v| v.error = Some(error.to_string()));
        error
    }
}
