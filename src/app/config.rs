use std::time::Duration;

use url::Url;

use super::error::ConfigError;
use super::types::Cli;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
const MIN_POLL_INTERVAL_MS: u64 = 100;
const MIN_REQUEST_TIMEOUT_MS: u64 = 1000;

/// Where the crawl service lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(20),
            user_agent: default_user_agent(),
        })
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::new(&cli.base_url)?;
        config.poll_interval = sanitize_poll_interval(cli.poll_interval_ms);
        config.request_timeout =
            Duration::from_millis(cli.request_timeout_ms.max(MIN_REQUEST_TIMEOUT_MS));
        if let Some(ua) = cli.user_agent.as_deref().map(str::trim)
            && !ua.is_empty()
        {
            config.user_agent = ua.to_string();
        }
        Ok(config)
    }
}

fn default_user_agent() -> String {
    format!("linkprobe/{}", env!("CARGO_PKG_VERSION"))
}

pub fn sanitize_poll_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_POLL_INTERVAL_MS))
}

/// Parses the service root. The path is always treated as a directory so
/// relative endpoints resolve below it.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://crawl.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://crawl.example.com/api/");
        assert_eq!(
            url.join("crawl").unwrap().as_str(),
            "https://crawl.example.com/api/crawl"
        );

        let root = parse_base_url("http://127.0.0.1:8080").unwrap();
        assert_eq!(root.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn base_url_rejects_unsupported_schemes() {
        assert!(matches!(
            parse_base_url("ftp://crawl.example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn cli_values_are_sanitized() {
        let cli = Cli::parse_from([
            "linkprobe",
            "https://site.test",
            "--base-url",
            "https://crawl.example.com",
            "--poll-interval-ms",
            "5",
            "--user-agent",
            "  ",
        ]);
        let config = ServiceConfig::from_cli(&cli).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert!(config.user_agent.starts_with("linkprobe/"));
    }
}
