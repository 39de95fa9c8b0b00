use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::OutputLayout;
use crate::fallback::{default_rules, FallbackRule};
use crate::fetch::{FetchSettings, RetryPolicy, DEFAULT_USER_AGENT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Everything a pipeline run needs; nothing is read from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub output: OutputLayout,
    /// Attempts per candidate URL.
    pub retry_limit: u32,
    pub backoff_base_secs: f64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    pub tags: Vec<String>,
    /// Items processed at once; 1 keeps the sequential order of the input list.
    pub concurrency: usize,
    /// No new item starts once this many seconds have passed.
    pub run_deadline_secs: Option<u64>,
    pub item_timeout_secs: Option<u64>,
    pub render_pdf: bool,
    /// Upper bound for one PDF render; exceeding it skips the PDF, not the item.
    pub render_timeout_secs: u64,
    pub fast_fail_client_errors: bool,
    pub fallback_rules: Vec<FallbackRule>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output: OutputLayout::default(),
            retry_limit: 3,
            backoff_base_secs: 2.0,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            redirect_limit: 10,
            max_bytes: 50 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tags: vec!["techdocs".to_string()],
            concurrency: 1,
            run_deadline_secs: None,
            item_timeout_secs: None,
            render_pdf: false,
            render_timeout_secs: 120,
            fast_fail_client_errors: false,
            fallback_rules: default_rules(),
        }
    }
}

impl PipelineConfig {
    pub fn with_output_root(root: &Path) -> Self {
        Self {
            output: OutputLayout::under(root),
            ..Self::default()
        }
    }

    /// Load a RON config; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_limit.max(1),
            backoff_base_secs: self.backoff_base_secs,
            fast_fail_client_errors: self.fast_fail_client_errors,
        }
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_secs.map(Duration::from_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_knob() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.backoff_base_secs, 2.0);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.render_timeout(), Duration::from_secs(120));
        assert_eq!(config.output.metadata_path, Path::new("data").join("metadata.jsonl"));
        assert_eq!(config.fallback_rules, default_rules());
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = PipelineConfig::from_ron(
            r#"(
                retry_limit: 5,
                concurrency: 4,
                run_deadline_secs: Some(600),
                output: (html_dir: "out/html"),
            )"#,
        )
        .unwrap();
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.run_deadline(), Some(Duration::from_secs(600)));
        assert_eq!(config.output.html_dir, PathBuf::from("out/html"));
        assert_eq!(config.output.md_dir, Path::new("data").join("md"));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn fallback_rules_can_be_replaced() {
        let config = PipelineConfig::from_ron(
            r#"(fallback_rules: [
                PathPrefix(host: "docs.example.com", prefix: "/latest/", replacements: ["/stable/"]),
            ])"#,
        )
        .unwrap();
        assert_eq!(config.fallback_rules.len(), 1);
    }

    #[test]
    fn retry_policy_never_drops_below_one_attempt() {
        let config = PipelineConfig {
            retry_limit: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = PipelineConfig::load(Path::new("/no/such/corpus.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
