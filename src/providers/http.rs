/*!
 * HTTP plumbing shared by the remote providers: client construction,
 * status classification, rate limiting and retry with exponential backoff.
 */

use log::{debug, error, warn};
use reqwest::{Client, Response, StatusCode};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

/// Build an HTTP client with the configured timeout
pub fn build_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))
}

/// Map a transport-level reqwest failure
pub fn map_send_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Map an unsuccessful HTTP status to a provider error
pub fn error_from_status(status: StatusCode, body: String, retry_after_secs: Option<u64>) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded {
            message: body,
            retry_after_secs,
        },
        // DeepL answers 456 when the character quota is used up
        402 | 456 => ProviderError::OutOfCredits(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Spaces requests so that at most `rate_limit` are sent per minute
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(rate_limit: Option<u32>) -> Self {
        let min_interval = rate_limit
            .filter(|rpm| *rpm > 0)
            .map(|rpm| Duration::from_millis(60_000 / rpm as u64));

        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Retry settings of one provider
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetrySettings {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
        }
    }

    fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let backoff_ms = self.backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
        let requested_ms = retry_after_secs.unwrap_or(0).saturating_mul(1000);
        Duration::from_millis(backoff_ms.max(requested_ms))
    }
}

/// Send a request, retrying connection failures, rate limits and server errors
///
/// Client errors are returned immediately. `send` is called once per attempt.
pub async fn send_with_retry<F, Fut>(
    service: &str,
    settings: RetrySettings,
    limiter: &RateLimiter,
    mut send: F,
) -> Result<Response, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;

    loop {
        limiter.acquire().await;

        let error = match send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to get error response text".to_string());
                error!("{} API error ({}): {}", service, status, body);
                error_from_status(status, body, retry_after)
            }
            Err(e) => {
                let error = map_send_error(e);
                error!("{} API network error: {}", service, error);
                error
            }
        };

        let retryable = match &error {
            ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded { .. } => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        };

        attempt += 1;
        if !retryable || attempt > settings.max_retries {
            return Err(error);
        }

        let retry_after = match &error {
            ProviderError::RateLimitExceeded { retry_after_secs, .. } => *retry_after_secs,
            _ => None,
        };
        let delay = settings.backoff(attempt, retry_after);
        warn!(
            "{} request failed, retrying in {:?} (attempt {}/{})",
            service,
            delay,
            attempt,
            settings.max_retries
        );
        tokio::time::sleep(delay).await;
        debug!("{} retry attempt {}", service, attempt);
    }
}
