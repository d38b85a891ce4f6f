use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use super::config::DEFAULT_POLL_INTERVAL;
use super::error::ClientError;
use super::remote::RemoteService;
use super::types::{JobId, JobPhase, LinkDefect, TaskHandle, TaskStatus, UiState};

pub const REPORT_FILE_NAME: &str = "broken_links.pdf";

struct AbortTaskOnDrop(tokio::task::AbortHandle);

impl Drop for AbortTaskOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A downloaded report, ready to be written by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
}

/// Drives crawl jobs against a `RemoteService` and publishes their progress
/// as `UiState`.
///
/// Only one job is tracked at a time. Submitting a new job cancels the
/// previous one and any late result it produces is dropped. Dropping the
/// client cancels the job in flight.
pub struct TaskClient<S: RemoteService> {
    service: Arc<S>,
    state: Arc<watch::Sender<UiState>>,
    current_job: Arc<AtomicU64>,
    poll_interval: Duration,
    job: Option<AbortTaskOnDrop>,
}

impl<S: RemoteService> TaskClient<S> {
    pub fn new(service: S) -> Self {
        Self::with_poll_interval(service, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(service: S, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self {
            service: Arc::new(service),
            state: Arc::new(state),
            current_job: Arc::new(AtomicU64::new(0)),
            poll_interval,
            job: None,
        }
    }

    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    /// Starts a crawl of `url`, superseding any job still in flight.
    ///
    /// `loading` is raised and the previous error cleared before this
    /// returns. Must be called from within a tokio runtime.
    pub fn submit(&mut self, url: impl Into<String>) -> JobId {
        let url = url.into();
        self.job = None;

        let mut job_id = 0;
        self.state.send_modify(|state| {
            job_id = self.current_job.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            state.error = None;
            state.phase = JobPhase::Submitting;
            state.task_id = None;
            state.pending_polls = 0;
        });
        log::info!("job {job_id}: submitting crawl for '{url}'");

        let job = JobContext {
            id: job_id,
            current: Arc::clone(&self.current_job),
            state: Arc::clone(&self.state),
        };
        let service = Arc::clone(&self.service);
        let poll_interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            run_job(service, job, url, poll_interval).await;
        });
        self.job = Some(AbortTaskOnDrop(handle.abort_handle()));
        job_id
    }

    /// Stops tracking the job in flight. Results and errors already shown
    /// are kept.
    pub fn cancel(&mut self) {
        let Some(guard) = self.job.take() else {
            return;
        };
        drop(guard);
        self.state.send_modify(|state| {
            let job_id = self.current_job.fetch_add(1, Ordering::SeqCst);
            if state.phase.is_active() {
                log::info!("job {job_id}: cancelled");
                state.phase = JobPhase::Idle;
            }
            state.loading = false;
        });
    }

    /// Fetches the PDF report. Failures are logged and returned, the job
    /// state is never touched.
    ///
    /// The returned future owns what it needs and can be spawned.
    pub fn download_artifact(
        &self,
    ) -> impl Future<Output = Result<Artifact, ClientError>> + Send + use<S> {
        let service = Arc::clone(&self.service);
        async move {
            match service.download_report().await {
                Ok(bytes) => {
                    log::info!("downloaded report ({} bytes)", bytes.len());
                    Ok(Artifact {
                        file_name: REPORT_FILE_NAME,
                        bytes,
                    })
                }
                Err(err) => {
                    let err = ClientError::DownloadFailed(err);
                    log::error!("{err}");
                    Err(err)
                }
            }
        }
    }
}

impl<S: RemoteService> Drop for TaskClient<S> {
    fn drop(&mut self) {
        self.job = None;
        // Bumped under the write lock so a job caught between two awaits
        // cannot publish once more. Receivers are not notified.
        self.state.send_if_modified(|_| {
            self.current_job.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
}

/// Handle a job uses to publish state. Writes are dropped once the job has
/// been superseded or cancelled.
struct JobContext {
    id: JobId,
    current: Arc<AtomicU64>,
    state: Arc<watch::Sender<UiState>>,
}

impl JobContext {
    fn apply(&self, update: impl FnOnce(&mut UiState)) -> bool {
        // The generation check runs under the channel's write lock, the same
        // lock `submit` and `cancel` hold when they bump it.
        self.state.send_if_modified(|state| {
            if self.current.load(Ordering::SeqCst) != self.id {
                return false;
            }
            update(state);
            true
        })
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }

    fn resolve(&self, results: Vec<LinkDefect>) {
        let count = results.len();
        if self.apply(|state| {
            state.results = results;
            state.error = None;
            state.loading = false;
            state.phase = JobPhase::Resolved;
        }) {
            log::info!("job {}: resolved with {count} broken links", self.id);
        }
    }

    fn fail(&self, err: ClientError) {
        let message = err.to_string();
        if self.apply(|state| {
            state.error = Some(message);
            state.results.clear();
            state.loading = false;
            state.phase = JobPhase::Errored;
        }) {
            match &err {
                ClientError::SubmissionFailed(cause)
                | ClientError::PollingFailed(cause)
                | ClientError::FetchResultsFailed(cause) => {
                    log::warn!("job {}: {err} ({cause})", self.id);
                }
                _ => log::warn!("job {}: {err}", self.id),
            }
        } else {
            log::debug!("job {}: dropped stale failure: {err}", self.id);
        }
    }
}

async fn run_job<S: RemoteService>(
    service: Arc<S>,
    job: JobContext,
    url: String,
    poll_interval: Duration,
) {
    let handle = match service.submit_crawl(&url).await {
        Ok(handle) => handle,
        Err(err) => {
            job.fail(ClientError::SubmissionFailed(err));
            return;
        }
    };

    let accepted = handle.clone();
    if !job.apply(|state| {
        state.task_id = Some(accepted);
        state.phase = JobPhase::Polling;
    }) {
        return;
    }
    log::info!("job {}: task {handle} accepted, polling", job.id);

    if let Err(err) = poll_until_done(service.as_ref(), &job, &handle, poll_interval).await {
        job.fail(err);
        return;
    }

    if !job.apply(|state| state.phase = JobPhase::Fetching) {
        return;
    }
    match service.fetch_results().await {
        Ok(results) => job.resolve(results),
        Err(err) => job.fail(ClientError::FetchResultsFailed(err)),
    }
}

/// Checks the task once per interval until it reaches a terminal state.
/// The next check is only scheduled after the previous one returned.
async fn poll_until_done<S: RemoteService>(
    service: &S,
    job: &JobContext,
    handle: &TaskHandle,
    poll_interval: Duration,
) -> Result<(), ClientError> {
    loop {
        tokio::time::sleep(poll_interval).await;
        if !job.is_current() {
            return Ok(());
        }

        let status = service
            .task_status(handle)
            .await
            .map_err(ClientError::PollingFailed)?;
        log::debug!("job {}: task {handle} is {}", job.id, status.label());

        match status {
            TaskStatus::Success => return Ok(()),
            TaskStatus::Failure => return Err(ClientError::TaskFailed),
            TaskStatus::Pending => {
                if !job.apply(|state| state.pending_polls = state.pending_polls.saturating_add(1))
                {
                    return Ok(());
                }
            }
        }
    }
}
