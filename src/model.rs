/*!
 * Domain types shared by the orchestration, provider and persistence layers.
 *
 * All references (`LanguageRef`, `ProjectRef`, `KeyRef`) are immutable
 * snapshots handed into an orchestration call; results are built fresh
 * for every call.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

/// A project language as known to the language catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageRef {
    /// Catalog identifier
    pub id: i64,
    /// BCP 47 tag, e.g. "en" or "de-DE"
    pub tag: String,
    /// Description handed to prompt-based providers
    #[serde(default)]
    pub ai_description: Option<String>,
}

impl LanguageRef {
    pub fn new(id: i64, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
            ai_description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.ai_description = Some(description.into());
        self
    }
}

/// Snapshot of the project a translation is requested for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    /// Organization billed for the translation
    pub organization_owner_id: i64,
    /// Project description handed to prompt-based providers
    #[serde(default)]
    pub ai_description: Option<String>,
}

impl ProjectRef {
    pub fn new(id: i64, organization_owner_id: i64) -> Self {
        Self {
            id,
            organization_owner_id,
            ai_description: None,
        }
    }
}

/// Identity of a translatable string within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl KeyRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Machine translation service type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MtServiceType {
    /// Google Cloud Translation v2
    Google,
    /// DeepL API v2
    Deepl,
    /// Anthropic Messages API (prompt-based)
    Anthropic,
    /// Local Ollama server (prompt-based)
    Ollama,
}

impl MtServiceType {
    /// All known service types, in display order
    pub const ALL: [MtServiceType; 4] = [Self::Google, Self::Deepl, Self::Anthropic, Self::Ollama];

    /// Prompt-based services consume translation memory and context hints
    pub fn uses_metadata(&self) -> bool {
        matches!(self, Self::Anthropic | Self::Ollama)
    }

    /// Whether the service can run without an API key
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google Translate",
            Self::Deepl => "DeepL",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Deepl => "deepl",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for MtServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MtServiceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "deepl" => Ok(Self::Deepl),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid machine translation service: {}", s)),
        }
    }
}

/// Formality requested from services that support it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    #[default]
    Default,
    Formal,
    Informal,
}

/// A service enabled for a language, with its per-language options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MtServiceInfo {
    pub service_type: MtServiceType,
    #[serde(default)]
    pub formality: Option<Formality>,
}

impl MtServiceInfo {
    pub fn new(service_type: MtServiceType) -> Self {
        Self {
            service_type,
            formality: None,
        }
    }

    pub fn with_formality(mut self, formality: Formality) -> Self {
        self.formality = Some(formality);
        self
    }

    pub fn uses_metadata(&self) -> bool {
        self.service_type.uses_metadata()
    }
}

/// A single contextual hint: how a similar or nearby string was translated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleItem {
    pub key: String,
    pub source: String,
    pub target: String,
}

impl ExampleItem {
    pub fn new(key: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Contextual hints for one target language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Translation memory matches
    pub examples: Vec<ExampleItem>,
    /// Translations of keys related to the current key
    pub close_items: Vec<ExampleItem>,
    pub key_description: Option<String>,
    pub project_description: Option<String>,
    pub language_description: Option<String>,
}

/// Output of one provider for one target language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResult {
    /// `None` only when the base text was blank
    pub translated_text: Option<String>,
    pub context_description: Option<String>,
    /// Cost in credits
    pub actual_price: u64,
    pub used_service: MtServiceType,
    /// Set when no provider was contacted because the base text was blank
    pub base_blank: bool,
}

impl TranslateResult {
    pub fn new(used_service: MtServiceType, translated_text: impl Into<String>, actual_price: u64) -> Self {
        Self {
            translated_text: Some(translated_text.into()),
            context_description: None,
            actual_price,
            used_service,
            base_blank: false,
        }
    }

    /// Zero-cost placeholder result for a blank base text
    pub fn blank(used_service: MtServiceType) -> Self {
        Self {
            translated_text: None,
            context_description: None,
            actual_price: 0,
            used_service,
            base_blank: true,
        }
    }
}
