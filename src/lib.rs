//! Client for a remote broken-link crawling service.
//!
//! [`TaskClient`] submits a crawl, polls the task until it finishes and
//! publishes the outcome as [`UiState`]. The service itself sits behind the
//! [`RemoteService`] trait; [`HttpRemoteService`] talks to the real HTTP API.

pub mod app;

pub use app::config::ServiceConfig;
pub use app::crawl::{Artifact, REPORT_FILE_NAME, TaskClient};
pub use app::error::{ClientError, ConfigError, ServiceError};
pub use app::remote::{HttpRemoteService, RemoteService};
pub use app::types::{JobId, JobPhase, LinkDefect, TaskHandle, TaskStatus, UiState};
