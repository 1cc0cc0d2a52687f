use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils::{primary_subtag, to_deepl_code};
use crate::model::{Formality, MtServiceType};

use super::http::{RateLimiter, RetrySettings, build_client, send_with_retry};
use super::{MtProvider, ProviderParams, ProviderTranslation};

/// Target languages DeepL accepts a formality setting for
const FORMALITY_LANGUAGES: [&str; 9] = ["de", "fr", "it", "es", "nl", "pl", "pt", "ru", "ja"];

/// Primary subtags DeepL can translate into
const SUPPORTED_LANGUAGES: [&str; 31] = [
    "ar", "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja", "ko",
    "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk", "zh", "no",
];

/// DeepL API v2 client
pub struct Deepl {
    client: Client,
    api_key: String,
    endpoint: String,
    price_per_char: u64,
    retry: RetrySettings,
    limiter: RateLimiter,
}

#[derive(Debug, Serialize)]
struct DeeplRequest<'a> {
    text: Vec<&'a str>,
    source_lang: String,
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    formality: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

impl Deepl {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("DeepL API key cannot be empty"));
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

    fn formality_param(formality: Option<Formality>, target_tag: &str) -> Option<&'static str> {
        if !FORMALITY_LANGUAGES.contains(&primary_subtag(target_tag).as_str()) {
            return None;
        }

        match formality {
            Some(Formality::Formal) => Some("prefer_more"),
            Some(Formality::Informal) => Some("prefer_less"),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Deepl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deepl")
            .field("api_key", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl MtProvider for Deepl {
    fn service_type(&self) -> MtServiceType {
        MtServiceType::Deepl
    }

    fn supports_language(&self, tag: &str) -> bool {
        SUPPORTED_LANGUAGES.contains(&primary_subtag(tag).as_str())
    }

    async fn translate(&self, params: &ProviderParams) -> Result<ProviderTranslation, ProviderError> {
        if !self.supports_language(&params.target_tag) {
            return Err(ProviderError::UnsupportedLanguage(params.target_tag.clone()));
        }

        let body = DeeplRequest {
            text: vec![params.text.as_str()],
            source_lang: to_deepl_code(&params.source_tag, false),
            target_lang: to_deepl_code(&params.target_tag, true),
            formality: Self::formality_param(params.formality, &params.target_tag),
        };
        let url = format!("{}/translate", self.endpoint.trim_end_matches('/'));
        let auth = format!("DeepL-Auth-Key {}", self.api_key);

        let response = send_with_retry("DeepL", self.retry, &self.limiter, || {
            self.client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, &auth)
                .json(&body)
                .send()
        })
        .await?;

        let parsed: DeeplResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let translated = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("missing 'translations' entry".to_string()))?;

        let price = params.text.chars().count() as u64 * self.price_per_char;
        Ok(ProviderTranslation::new(translated.text, price))
    }
}
