//! Scripted in-memory crawl service for lifecycle tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use linkprobe::{LinkDefect, RemoteService, ServiceError, TaskHandle, TaskStatus, UiState};
use tokio::sync::watch;

#[derive(Default)]
struct Script {
    submissions: HashMap<String, Result<TaskHandle, ServiceError>>,
    statuses: HashMap<String, VecDeque<Result<TaskStatus, ServiceError>>>,
    status_delays: HashMap<String, Duration>,
    results: VecDeque<Result<Vec<LinkDefect>, ServiceError>>,
    report: Option<Result<Vec<u8>, ServiceError>>,
}

#[derive(Default)]
struct Calls {
    submits: Vec<String>,
    statuses: HashMap<String, usize>,
    fetches: usize,
    downloads: usize,
}

/// Answers from a script. Status checks past the end of a task's script
/// report `Pending`.
#[derive(Clone, Default)]
pub struct ScriptedService {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Calls>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&self, url: &str, task_id: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .submissions
            .insert(url.to_string(), Ok(TaskHandle::new(task_id)));
        self
    }

    pub fn reject(&self, url: &str, status: u16, message: &str) -> &Self {
        self.script.lock().unwrap().submissions.insert(
            url.to_string(),
            Err(ServiceError::Rejected {
                status,
                message: message.to_string(),
            }),
        );
        self
    }

    pub fn statuses(&self, task_id: &str, script: Vec<Result<TaskStatus, ServiceError>>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .statuses
            .insert(task_id.to_string(), script.into());
        self
    }

    pub fn status_delay(&self, task_id: &str, delay: Duration) -> &Self {
        self.script
            .lock()
            .unwrap()
            .status_delays
            .insert(task_id.to_string(), delay);
        self
    }

    pub fn results(&self, result: Result<Vec<LinkDefect>, ServiceError>) -> &Self {
        self.script.lock().unwrap().results.push_back(result);
        self
    }

    pub fn report(&self, result: Result<Vec<u8>, ServiceError>) -> &Self {
        self.script.lock().unwrap().report = Some(result);
        self
    }

    pub fn status_calls(&self, task_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .statuses
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn fetch_calls(&self) -> usize {
        self.calls.lock().unwrap().fetches
    }

    pub fn download_calls(&self) -> usize {
        self.calls.lock().unwrap().downloads
    }

    pub fn submitted(&self) -> Vec<String> {
        self.calls.lock().unwrap().submits.clone()
    }
}

impl RemoteService for ScriptedService {
    async fn submit_crawl(&self, url: &str) -> Result<TaskHandle, ServiceError> {
        self.calls.lock().unwrap().submits.push(url.to_string());
        self.script
            .lock()
            .unwrap()
            .submissions
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(ServiceError::Transport("connection refused".to_string())))
    }

    async fn task_status(&self, handle: &TaskHandle) -> Result<TaskStatus, ServiceError> {
        *self
            .calls
            .lock()
            .unwrap()
            .statuses
            .entry(handle.as_str().to_string())
            .or_insert(0) += 1;
        let delay = self
            .script
            .lock()
            .unwrap()
            .status_delays
            .get(handle.as_str())
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .statuses
            .get_mut(handle.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(TaskStatus::Pending))
    }

    async fn fetch_results(&self) -> Result<Vec<LinkDefect>, ServiceError> {
        self.calls.lock().unwrap().fetches += 1;
        self.script
            .lock()
            .unwrap()
            .results
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn download_report(&self) -> Result<Vec<u8>, ServiceError> {
        self.calls.lock().unwrap().downloads += 1;
        self.script
            .lock()
            .unwrap()
            .report
            .clone()
            .unwrap_or_else(|| Err(ServiceError::Transport("no report".to_string())))
    }
}

pub fn defect(source: &str, target: &str, code: u16, external: bool) -> LinkDefect {
    LinkDefect {
        source_page: source.to_string(),
        link_text: format!("link to {target}"),
        broken_link: target.to_string(),
        http_code: code,
        external,
    }
}

/// Waits until the current job has left the active phases.
pub async fn settled(rx: &mut watch::Receiver<UiState>) -> UiState {
    rx.wait_for(|state| state.is_settled())
        .await
        .expect("client dropped while waiting")
        .clone()
}
