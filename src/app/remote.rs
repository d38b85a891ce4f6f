use std::future::Future;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

use super::config::ServiceConfig;
use super::error::ServiceError;
use super::types::{LinkDefect, TaskHandle, TaskStatus};

/// The backend that runs crawl jobs.
pub trait RemoteService: Send + Sync + 'static {
    /// Starts a crawl of `url` and returns the handle of the new task.
    fn submit_crawl(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<TaskHandle, ServiceError>> + Send;

    fn task_status(
        &self,
        handle: &TaskHandle,
    ) -> impl Future<Output = Result<TaskStatus, ServiceError>> + Send;

    /// The complete result set of the last finished crawl.
    fn fetch_results(&self) -> impl Future<Output = Result<Vec<LinkDefect>, ServiceError>> + Send;

    /// The PDF report of the last finished crawl.
    fn download_report(&self) -> impl Future<Output = Result<Vec<u8>, ServiceError>> + Send;
}

#[derive(Debug, Serialize)]
struct CrawlRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct CrawlResponse {
    task_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: String,
}

/// `RemoteService` over the crawl service's HTTP API.
pub struct HttpRemoteService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemoteService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(config, client))
    }

    /// Uses a preconfigured `reqwest::Client`; timeout and user agent from
    /// `config` are not applied.
    pub fn with_client(config: &ServiceConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ServiceError::InvalidEndpoint(self.base_url.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<(StatusCode, Vec<u8>), ServiceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }
}

fn rejected(status: StatusCode, message: Option<String>, fallback: &str) -> ServiceError {
    ServiceError::Rejected {
        status: status.as_u16(),
        message: message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    }
}

impl RemoteService for HttpRemoteService {
    async fn submit_crawl(&self, url: &str) -> Result<TaskHandle, ServiceError> {
        let endpoint = self.endpoint(&["crawl"])?;
        let body = serde_json::to_vec(&CrawlRequest { url })?;
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let parsed = serde_json::from_slice::<CrawlResponse>(&bytes).unwrap_or_default();
            return Err(rejected(status, parsed.error, "crawl request failed"));
        }

        let parsed = serde_json::from_slice::<CrawlResponse>(&bytes)?;
        match parsed.task_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Ok(TaskHandle::new(id)),
            None => Err(ServiceError::Malformed(
                "crawl response has no task_id".to_string(),
            )),
        }
    }

    async fn task_status(&self, handle: &TaskHandle) -> Result<TaskStatus, ServiceError> {
        let endpoint = self.endpoint(&["task-status", handle.as_str()])?;
        let (status, bytes) = self.get_bytes(endpoint).await?;
        if !status.is_success() {
            return Err(rejected(status, None, &format!("status check returned {status}")));
        }
        let parsed = serde_json::from_slice::<StatusResponse>(&bytes)?;
        Ok(TaskStatus::from_label(&parsed.state))
    }

    async fn fetch_results(&self) -> Result<Vec<LinkDefect>, ServiceError> {
        let endpoint = self.endpoint(&["members"])?;
        let (status, bytes) = self.get_bytes(endpoint).await?;
        if !status.is_success() {
            return Err(rejected(status, None, &format!("results returned {status}")));
        }
        Ok(serde_json::from_slice::<Vec<LinkDefect>>(&bytes)?)
    }

    async fn download_report(&self) -> Result<Vec<u8>, ServiceError> {
        let endpoint = self.endpoint(&["download"])?;
        let (status, bytes) = self.get_bytes(endpoint).await?;
        if !status.is_success() {
            return Err(rejected(status, None, &format!("download returned {status}")));
        }
        Ok(bytes)
    }
}
