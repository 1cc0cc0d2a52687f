use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::batch::RetryPolicy;
use crate::model::{Formality, MtServiceType};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Longest base text (in characters) accepted for machine translation
    #[serde(default = "default_max_translation_text_length")]
    pub max_translation_text_length: usize,

    /// Which services are enabled, and which is primary, per language
    #[serde(default)]
    pub machine_translation: MtSettingsConfig,

    /// Credentials and tuning for each provider
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Retry policy for background batch chunks
    #[serde(default)]
    pub batch: BatchConfig,

    /// Whether provider results are cached in memory
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// SQLite database location (defaults to the user data directory)
    #[serde(default)]
    pub database_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Per-language service settings with a project-wide default
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MtSettingsConfig {
    /// Services enabled for languages without an override
    #[serde(default = "default_enabled_services")]
    pub default_enabled_services: Vec<MtServiceType>,

    /// Primary service for languages without an override
    #[serde(default = "default_primary_service")]
    pub default_primary_service: Option<MtServiceType>,

    /// Language specific overrides
    #[serde(default)]
    pub languages: Vec<LanguageMtConfig>,
}

impl Default for MtSettingsConfig {
    fn default() -> Self {
        Self {
            default_enabled_services: default_enabled_services(),
            default_primary_service: default_primary_service(),
            languages: Vec::new(),
        }
    }
}

/// Service settings for a single language tag
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LanguageMtConfig {
    /// Language tag the override applies to ("de" also covers "de-AT")
    pub tag: String,

    #[serde(default)]
    pub enabled_services: Vec<MtServiceType>,

    #[serde(default)]
    pub primary_service: Option<MtServiceType>,

    /// Formality passed to services that support it
    #[serde(default)]
    pub formality: Option<Formality>,
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Service type identifier
    #[serde(rename = "type")]
    pub service_type: MtServiceType,

    // @field: Model name (prompt-based services only)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retries for transient transport failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,

    // @field: Credits per billing unit (source characters, or tokens for prompt-based services)
    #[serde(default = "default_price_per_char")]
    pub price_per_char: u64,

    // @field: Share of the price charged for batch calls, in percent
    #[serde(default = "default_batch_price_percent")]
    pub batch_price_percent: u32,
}

impl ProviderConfig {
    // @param service_type: Service enum
    // @returns: Provider config with defaults
    pub fn new(service_type: MtServiceType) -> Self {
        let (model, endpoint, price_per_char, rate_limit) = match service_type {
            MtServiceType::Google => (String::new(), default_google_endpoint(), 1, Some(600)),
            MtServiceType::Deepl => (String::new(), default_deepl_endpoint(), 1, Some(300)),
            MtServiceType::Anthropic => (default_anthropic_model(), default_anthropic_endpoint(), 0, Some(45)),
            MtServiceType::Ollama => (default_ollama_model(), default_ollama_endpoint(), 0, None),
        };

        Self {
            service_type,
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit,
            price_per_char,
            batch_price_percent: default_batch_price_percent(),
        }
    }

    /// Whether the provider has everything it needs to be called
    pub fn is_usable(&self) -> bool {
        self.service_type.is_local() || !self.api_key.trim().is_empty()
    }

    /// Endpoint, falling back to the service default when unset
    pub fn effective_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }

        match self.service_type {
            MtServiceType::Google => default_google_endpoint(),
            MtServiceType::Deepl => default_deepl_endpoint(),
            MtServiceType::Anthropic => default_anthropic_endpoint(),
            MtServiceType::Ollama => default_ollama_endpoint(),
        }
    }

    /// Model, falling back to the service default when unset
    pub fn effective_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }

        match self.service_type {
            MtServiceType::Anthropic => default_anthropic_model(),
            MtServiceType::Ollama => default_ollama_model(),
            _ => String::new(),
        }
    }
}

/// Batch chunk retry settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Delay before the first requeue, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub delay_ms: u64,

    /// Multiplier applied to the delay on every further requeue
    #[serde(default = "default_batch_increase_factor")]
    pub increase_factor: u32,

    /// Requeues allowed before a chunk is failed for good
    #[serde(default = "default_batch_max_retries")]
    pub max_retries: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_batch_delay_ms(),
            increase_factor: default_batch_increase_factor(),
            max_retries: default_batch_max_retries(),
        }
    }
}

impl BatchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.delay_ms, self.increase_factor, self.max_retries)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_max_translation_text_length() -> usize {
    10_000
}

fn default_enabled_services() -> Vec<MtServiceType> {
    vec![MtServiceType::Google, MtServiceType::Deepl]
}

fn default_primary_service() -> Option<MtServiceType> {
    Some(MtServiceType::Google)
}

fn default_providers() -> Vec<ProviderConfig> {
    MtServiceType::ALL.iter().map(|s| ProviderConfig::new(*s)).collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_price_per_char() -> u64 {
    1
}

fn default_batch_price_percent() -> u32 {
    100
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_batch_increase_factor() -> u32 {
    10
}

fn default_batch_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_google_endpoint() -> String {
    "https://translation.googleapis.com/language/translate/v2".to_string()
}

fn default_deepl_endpoint() -> String {
    "https://api.deepl.com/v2".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load the configuration, writing a default one first when the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))?;

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.max_translation_text_length == 0 {
            return Err(anyhow!("max_translation_text_length must be greater than zero"));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.service_type) {
                return Err(anyhow!("Provider {} is configured more than once", provider.service_type));
            }

            if !provider.endpoint.is_empty() {
                Url::parse(&provider.endpoint)
                    .with_context(|| format!("Invalid endpoint for {}: {}", provider.service_type, provider.endpoint))?;
            }
        }

        let settings = &self.machine_translation;
        if let Some(primary) = settings.default_primary_service {
            if !settings.default_enabled_services.contains(&primary) {
                return Err(anyhow!("Default primary service {} is not enabled", primary));
            }
        }

        for language in &settings.languages {
            crate::language_utils::validate_language_tag(&language.tag)?;

            if let Some(primary) = language.primary_service {
                if !language.enabled_services.contains(&primary) {
                    return Err(anyhow!(
                        "Primary service {} is not enabled for language {}",
                        primary, language.tag
                    ));
                }
            }
        }

        // Every enabled remote service needs credentials
        let enabled = settings
            .default_enabled_services
            .iter()
            .chain(settings.languages.iter().flat_map(|l| l.enabled_services.iter()));

        for service in enabled {
            match self.get_provider_config(*service) {
                Some(provider) if provider.is_usable() => {}
                Some(_) => {
                    return Err(anyhow!("API key is required for enabled service {}", service));
                }
                None => {
                    return Err(anyhow!("No provider configured for enabled service {}", service));
                }
            }
        }

        Ok(())
    }

    /// Get the provider configuration for a service type
    pub fn get_provider_config(&self, service_type: MtServiceType) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.service_type == service_type)
    }

    /// Retry policy used for batch chunks
    pub fn retry_policy(&self) -> RetryPolicy {
        self.batch.retry_policy()
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            max_translation_text_length: default_max_translation_text_length(),
            machine_translation: MtSettingsConfig::default(),
            providers: default_providers(),
            batch: BatchConfig::default(),
            cache_enabled: true,
            database_path: None,
            log_level: LogLevel::default(),
        }
    }
}
