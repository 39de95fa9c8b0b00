use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

use crate::dispatch::ContentKind;

/// One URL from the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub url: String,
}

impl SourceItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl From<&str> for SourceItem {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// A successful response together with the candidate URL that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    /// Charset declared by the `Content-Type` header, if any.
    pub encoding: Option<String>,
    pub served_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Client errors that another attempt on the same URL will not fix.
    pub fn is_client_error(&self) -> bool {
        match self.kind {
            FailureKind::HttpStatus(code) => {
                (400..500).contains(&code) && code != 408 && code != 429
            }
            FailureKind::InvalidUrl => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Every candidate failed every attempt; carries the most recent error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("all {attempts} fetch attempts failed, last error: {last}")]
pub struct FetchExhausted {
    pub attempts: usize,
    pub last: FetchError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ok: usize,
    pub failed: usize,
    /// Items never started because the run was cancelled or hit its deadline.
    pub skipped: usize,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OK={}, FAIL={}", self.ok, self.failed)?;
        if self.skipped > 0 {
            write!(f, ", SKIPPED={}", self.skipped)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    FallbackUsed {
        url: String,
        served_from: String,
    },
    Saved {
        url: String,
        kind: ContentKind,
        path: PathBuf,
        companion: Option<PathBuf>,
    },
    PdfRendered {
        url: String,
        path: PathBuf,
    },
    PdfSkipped {
        url: String,
        reason: String,
    },
    Failed {
        url: String,
        error: String,
    },
    Skipped {
        url: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that drops every event; the log lines still carry the diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: PipelineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_formats_like_the_console_line() {
        let summary = RunSummary {
            ok: 18,
            failed: 2,
            skipped: 0,
        };
        assert_eq!(summary.to_string(), "OK=18, FAIL=2");
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn client_errors_exclude_retryable_statuses() {
        assert!(FetchError::new(FailureKind::HttpStatus(404), "").is_client_error());
        assert!(!FetchError::new(FailureKind::HttpStatus(429), "").is_client_error());
        assert!(!FetchError::new(FailureKind::HttpStatus(503), "").is_client_error());
        assert!(!FetchError::new(FailureKind::Timeout, "").is_client_error());
    }
}
