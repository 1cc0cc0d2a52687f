use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils::to_google_code;
use crate::model::MtServiceType;

use super::http::{RateLimiter, RetrySettings, build_client, send_with_retry};
use super::{MtProvider, ProviderParams, ProviderTranslation};

/// Google Cloud Translation v2 client
pub struct GoogleTranslate {
    client: Client,
    api_key: String,
    endpoint: String,
    price_per_char: u64,
    retry: RetrySettings,
    limiter: RateLimiter,
}

/// Translate request body
#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    q: Vec<&'a str>,
    source: String,
    target: String,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

impl GoogleTranslate {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("Google Translate API key cannot be empty"));
        }

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            endpoint: config.effective_endpoint(),
            price_per_char: config.price_per_char,
            retry: RetrySettings::from_config(config),
            limiter: RateLimiter::new(config.rate_limit),
        })
    }
}

impl std::fmt::Debug for GoogleTranslate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslate")
            .field("api_key", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl MtProvider for GoogleTranslate {
    fn service_type(&self) -> MtServiceType {
        MtServiceType::Google
    }

    async fn translate(&self, params: &ProviderParams) -> Result<ProviderTranslation, ProviderError> {
        let body = GoogleRequest {
            q: vec![params.text.as_str()],
            source: to_google_code(&params.source_tag),
            target: to_google_code(&params.target_tag),
            format: "text",
        };

        let response = send_with_retry("Google Translate", self.retry, &self.limiter, || {
            self.client
                .post(&self.endpoint)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send()
        })
        .await?;

        let parsed: GoogleResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let translated = parsed
            .data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("missing 'data.translations' entry".to_string()))?;

        let price = params.text.chars().count() as u64 * self.price_per_char;
        Ok(ProviderTranslation::new(translated.translated_text, price))
    }
}
