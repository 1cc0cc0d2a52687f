/*!
 * Mock provider implementation for testing and offline runs.
 *
 * The mock simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged echo of the text
 * - `MockProvider::intermittent(n)` - Fails every n-th request with a 503
 * - `MockProvider::failing()` - Always fails with a 500
 * - `MockProvider::unauthorized()` / `MockProvider::rate_limited()` - Fail with typed errors
 *
 * Every call is recorded so tests can assert on what the provider received.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::model::MtServiceType;

use super::{MtProvider, ProviderParams, ProviderTranslation};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
    /// Always fails with a rate limit error
    RateLimited,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    service_type: MtServiceType,
    behavior: MockBehavior,
    /// Credits charged per character of the text
    price_per_char: u64,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    calls: Arc<Mutex<Vec<ProviderParams>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&ProviderParams) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(service_type: MtServiceType, behavior: MockBehavior) -> Self {
        Self {
            service_type,
            behavior,
            price_per_char: 1,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MtServiceType::Google, MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MtServiceType::Google, MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MtServiceType::Google, MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MtServiceType::Google, MockBehavior::Unauthorized)
    }

    pub fn rate_limited() -> Self {
        Self::new(MtServiceType::Google, MockBehavior::RateLimited)
    }

    /// Report a different service type
    pub fn with_service_type(mut self, service_type: MtServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    pub fn with_price_per_char(mut self, price_per_char: u64) -> Self {
        self.price_per_char = price_per_char;
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&ProviderParams) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<ProviderParams> {
        self.calls.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn respond(&self, params: &ProviderParams) -> ProviderTranslation {
        let text = match self.custom_response {
            Some(generator) => generator(params),
            None => format!("[{}] {}", params.target_tag, params.text),
        };
        let price = params.text.chars().count() as u64 * self.price_per_char;
        ProviderTranslation::new(text, price)
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            service_type: self.service_type,
            behavior: self.behavior,
            price_per_char: self.price_per_char,
            request_count: Arc::clone(&self.request_count),
            calls: Arc::clone(&self.calls),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl MtProvider for MockProvider {
    fn service_type(&self) -> MtServiceType {
        self.service_type
    }

    async fn translate(&self, params: &ProviderParams) -> Result<ProviderTranslation, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(params.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(params)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(params))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),

            MockBehavior::RateLimited => Err(ProviderError::RateLimitExceeded {
                message: "Simulated rate limit".to_string(),
                retry_after_secs: Some(1),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(params))
            }
        }
    }
}
