use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::model::MtServiceType;

use super::http::{RateLimiter, RetrySettings, send_with_retry};
use super::prompt::{TranslationPromptBuilder, parse_answer};
use super::{MtProvider, ProviderParams, ProviderTranslation};

/// Local Ollama server answering through `/api/generate`
pub struct Ollama {
    base_url: String,
    client: Client,
    model: String,
    /// Credits per evaluated token, usually zero for a local server
    price_per_token: u64,
    retry: RetrySettings,
    limiter: RateLimiter,
    prompts: TranslationPromptBuilder,
}

/// Body of a non-streaming `/api/generate` call asking for a JSON answer
#[derive(Debug, Serialize)]
pub struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    format: &'static str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
}

/// One `/api/generate` answer, or several streamed ones merged
#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl GenerationResponse {
    fn tokens(&self) -> u64 {
        self.prompt_eval_count.unwrap_or(0) + self.eval_count.unwrap_or(0)
    }
}

impl<'a> GenerationRequest<'a> {
    pub fn json(model: &'a str, system: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            prompt,
            system,
            format: "json",
            stream: false,
            options: SamplingOptions { temperature: 0.3 },
        }
    }
}

impl Ollama {
    /// Create a new Ollama client from its provider configuration
    ///
    /// Ollama uses HTTP/1.1, so connections are kept alive rather than multiplexed.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: normalize_base_url(&config.effective_endpoint()),
            client,
            model: config.effective_model(),
            price_per_token: config.price_per_char,
            retry: RetrySettings::from_config(config),
            limiter: RateLimiter::new(config.rate_limit),
            prompts: TranslationPromptBuilder::default(),
        })
    }

    /// POST a generate request, retrying transient failures
    pub async fn generate(&self, request: &GenerationRequest<'_>) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = send_with_retry("Ollama", self.retry, &self.limiter, || {
            self.client.post(&url).json(request).send()
        })
        .await?;

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Ollama answer body unreadable: {}", e)))?;

        parse_generation(&response_text)
    }
}

/// Add a scheme and the default port when the endpoint lacks them
fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    let (scheme, host) = match endpoint.split_once("://") {
        Some((scheme, host)) => (scheme, host),
        None => ("http", endpoint),
    };

    if host.contains(':') {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}:11434", scheme, host)
    }
}

/// Parse a generate response, accepting both a single object and streamed JSON lines
fn parse_generation(response_text: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(response) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(response);
    }

    let preview: String = response_text.chars().take(200).collect();
    warn!("Ollama answer is not one JSON object, reading it as JSON lines: {}", preview);

    let chunks: Vec<GenerationResponse> = response_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<GenerationResponse>(line).ok())
        .collect();

    if chunks.is_empty() {
        return Err(ProviderError::ParseError(
            "Ollama answer contains no generate object".to_string(),
        ));
    }

    let last = chunks.last();
    Ok(GenerationResponse {
        response: chunks.iter().map(|c| c.response.as_str()).collect(),
        done: true,
        prompt_eval_count: last.and_then(|c| c.prompt_eval_count),
        eval_count: last.and_then(|c| c.eval_count),
    })
}

impl std::fmt::Debug for Ollama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ollama")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl MtProvider for Ollama {
    fn service_type(&self) -> MtServiceType {
        MtServiceType::Ollama
    }

    async fn translate(&self, params: &ProviderParams) -> Result<ProviderTranslation, ProviderError> {
        let prompt = self.prompts.build(params);
        let request = GenerationRequest::json(&self.model, &prompt.system, &prompt.user);

        let response = self.generate(&request).await?;
        let tokens = response.tokens();
        debug!("Ollama translation to {} used {} tokens", params.target_tag, tokens);

        let answer = parse_answer(&response.response)?;
        Ok(ProviderTranslation {
            translated_text: answer.output,
            context_description: answer.context_description,
            price: tokens * self.price_per_token,
        })
    }
}
