use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};

use crate::decode::charset_from_content_type;
use crate::{FailureKind, FetchError, FetchExhausted, FetchResult};

const MAX_BACKOFF_SECS: f64 = 86_400.0;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RAG-Corpus-Fetch/1.0)";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 10,
            max_bytes: 50 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A single GET attempt against one URL.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError>;
}

#[async_trait::async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.as_ref().fetch(url).await
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let redirect_limit = settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });
        let user_agent = HeaderValue::from_str(&settings.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchResult {
            bytes: bytes.into(),
            encoding: content_type.as_deref().and_then(charset_from_content_type),
            content_type,
            served_from: url.to_string(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per candidate, at least one.
    pub max_attempts: u32,
    /// Sleep `backoff_base_secs ^ attempt` seconds between attempts on a candidate.
    pub backoff_base_secs: f64,
    /// Skip the remaining attempts on a candidate after a non-retryable 4xx.
    pub fast_fail_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 2.0,
            fast_fail_client_errors: false,
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_base_secs.max(0.0).powi(exponent);
        Duration::from_secs_f64(secs.min(MAX_BACKOFF_SECS))
    }
}

/// Walks the candidate list in order with bounded retries per candidate.
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// First successful response across `candidates`, or the most recent error.
    pub async fn fetch(&self, candidates: &[String]) -> Result<FetchResult, FetchExhausted> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0;
        let mut last = FetchError::new(FailureKind::InvalidUrl, "no candidate urls");

        for candidate in candidates {
            for attempt in 1..=max_attempts {
                attempts += 1;
                match self.inner.fetch(candidate).await {
                    Ok(mut result) => {
                        result.served_from = candidate.clone();
                        if let Some(original) = candidates.first() {
                            if candidate != original {
                                engine_info!("Fallback used: {} -> {}", original, candidate);
                            }
                        }
                        return Ok(result);
                    }
                    Err(err) => {
                        engine_warn!(
                            "Fetch attempt {}/{} for {} failed: {}",
                            attempt,
                            max_attempts,
                            candidate,
                            err
                        );
                        let give_up = self.policy.fast_fail_client_errors && err.is_client_error();
                        last = err;
                        if give_up {
                            engine_debug!("Not retrying {} after client error", candidate);
                            break;
                        }
                        if attempt < max_attempts {
                            let delay = self.policy.backoff(attempt);
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                        }
                    }
                }
            }
        }

        Err(FetchExhausted { attempts, last })
    }
}
