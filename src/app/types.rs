use std::fmt;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "linkprobe",
    version,
    about = "Submit a site to a remote broken-link crawler and review the results"
)]
pub struct Cli {
    #[arg(value_name = "URL")]
    pub url: String,

    #[arg(long, env = "LINKPROBE_BASE_URL", value_name = "URL")]
    pub base_url: String,

    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub poll_interval_ms: u64,

    #[arg(long, value_name = "MS", default_value_t = 20000)]
    pub request_timeout_ms: u64,

    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    #[arg(long, value_enum, default_value_t = FileFormatArg::Csv)]
    pub format: FileFormatArg,

    #[arg(long, default_value_t = false)]
    pub download: bool,

    #[arg(long, value_name = "DIR", default_value = ".")]
    pub download_dir: String,

    #[arg(long, default_value_t = false)]
    pub auto_close: bool,

    #[arg(long, default_value_t = false)]
    pub no_tui: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum FileFormatArg {
    Csv,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

impl From<FileFormatArg> for DataFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Csv => DataFormat::Csv,
            FileFormatArg::Json => DataFormat::Json,
        }
    }
}

/// Identifier the backend issues for an accepted crawl job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by the backend for a task. Anything that is not a known
/// terminal state counts as still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => TaskStatus::Success,
            "FAILURE" => TaskStatus::Failure,
            _ => TaskStatus::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
        }
    }
}

/// One broken link reported by the crawler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefect {
    #[serde(rename = "Source_Page", default)]
    pub source_page: String,
    #[serde(rename = "Link_Text", default)]
    pub link_text: String,
    #[serde(rename = "Broken_Page_Link", default)]
    pub broken_link: String,
    #[serde(
        rename = "HTTP_Code",
        default,
        deserialize_with = "deserialize_http_code"
    )]
    pub http_code: u16,
    #[serde(rename = "External", default)]
    pub external: bool,
}

// The backend is not strict about HTTP_Code: numbers and numeric strings both show up.
fn deserialize_http_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let code = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    Ok(code.unwrap_or(0))
}

/// Monotonic job number inside one `TaskClient`.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
    Fetching,
    Resolved,
    Errored,
}

impl JobPhase {
    pub fn label(self) -> &'static str {
        match self {
            JobPhase::Idle => "idle",
            JobPhase::Submitting => "submitting",
            JobPhase::Polling => "polling",
            JobPhase::Fetching => "fetching",
            JobPhase::Resolved => "resolved",
            JobPhase::Errored => "errored",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobPhase::Submitting | JobPhase::Polling | JobPhase::Fetching
        )
    }
}

/// Everything a front end needs to render the current job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub loading: bool,
    pub error: Option<String>,
    pub results: Vec<LinkDefect>,
    pub phase: JobPhase,
    pub task_id: Option<TaskHandle>,
    pub pending_polls: u32,
}

impl UiState {
    pub fn external_count(&self) -> usize {
        self.results.iter().filter(|row| row.external).count()
    }

    pub fn is_settled(&self) -> bool {
        !self.phase.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_labels_are_pending() {
        assert_eq!(TaskStatus::from_label("SUCCESS"), TaskStatus::Success);
        assert_eq!(TaskStatus::from_label("failure"), TaskStatus::Failure);
        assert_eq!(TaskStatus::from_label("STARTED"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_label(""), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_label(" Success "), TaskStatus::Success);
    }

    #[test]
    fn link_defect_accepts_loose_http_codes() {
        let rows: Vec<LinkDefect> = serde_json::from_str(
            r#"[
                {"Source_Page":"https://a.test/","Link_Text":"docs","Broken_Page_Link":"https://a.test/docs","HTTP_Code":404,"External":false},
                {"Source_Page":"https://a.test/x","Link_Text":"","Broken_Page_Link":"https://b.test/","HTTP_Code":"503","External":true},
                {"Source_Page":"https://a.test/y","HTTP_Code":null}
            ]"#,
        )
        .unwrap();

        assert_eq!(rows[0].http_code, 404);
        assert_eq!(rows[1].http_code, 503);
        assert!(rows[1].external);
        assert_eq!(rows[2].http_code, 0);
        assert_eq!(rows[2].broken_link, "");
    }

    #[test]
    fn link_defect_serializes_with_wire_names() {
        let row = LinkDefect {
            source_page: "https://a.test/".to_string(),
            link_text: "home".to_string(),
            broken_link: "https://a.test/gone".to_string(),
            http_code: 410,
            external: false,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Broken_Page_Link"], "https://a.test/gone");
        assert_eq!(json["HTTP_Code"], 410);
    }
}
