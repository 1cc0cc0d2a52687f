use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::model::MtServiceType;

use super::http::{RateLimiter, RetrySettings, build_client, send_with_retry};
use super::prompt::{TranslationPromptBuilder, parse_answer};
use super::{MtProvider, ProviderParams, ProviderTranslation};

/// Answer length cap; translations of a single key stay far below it
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Claude through the Messages API
pub struct Anthropic {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    /// Credits per consumed token
    price_per_token: u64,
    retry: RetrySettings,
    limiter: RateLimiter,
    prompts: TranslationPromptBuilder,
}

/// `/v1/messages` body with a system prompt and a single user turn
#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    pub fn new(model: &'a str, system: &'a str, user: &'a str, max_tokens: u32) -> Self {
        Self {
            model,
            system,
            messages: [Message { role: "user", content: user }],
            max_tokens,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Only `text` blocks carry the answer; other kinds have no `text`
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl MessagesResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect()
    }

    pub fn tokens(&self) -> u64 {
        self.usage.input_tokens + self.usage.output_tokens
    }
}

impl Anthropic {
    /// Create a new Anthropic client from its provider configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("Anthropic API key cannot be empty"));
        }

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            endpoint: config.effective_endpoint(),
            model: config.effective_model(),
            price_per_token: config.price_per_char,
            retry: RetrySettings::from_config(config),
            limiter: RateLimiter::new(config.rate_limit),
            prompts: TranslationPromptBuilder::default(),
        })
    }

    /// POST a messages request, retrying transient failures
    pub async fn complete(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, ProviderError> {
        let api_url = format!("{}/v1/messages", self.endpoint.trim_end_matches('/'));

        let response = send_with_retry("Anthropic", self.retry, &self.limiter, || {
            self.client
                .post(&api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(request)
                .send()
        })
        .await?;

        response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Unexpected Anthropic answer: {}", e)))
    }
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("api_key", &"***")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl MtProvider for Anthropic {
    fn service_type(&self) -> MtServiceType {
        MtServiceType::Anthropic
    }

    async fn translate(&self, params: &ProviderParams) -> Result<ProviderTranslation, ProviderError> {
        let prompt = self.prompts.build(params);
        let request = MessagesRequest::new(&self.model, &prompt.system, &prompt.user, MAX_OUTPUT_TOKENS);

        let response = self.complete(&request).await?;
        let tokens = response.tokens();
        debug!("Anthropic translation to {} used {} tokens", params.target_tag, tokens);

        let answer = parse_answer(&response.text())?;
        Ok(ProviderTranslation {
            translated_text: answer.output,
            context_description: answer.context_description,
            price: tokens * self.price_per_token,
        })
    }
}
