/*!
 * Prompt construction for prompt-based providers.
 *
 * The prompt carries the text to translate plus every contextual hint from
 * the metadata (translation memory examples, translations of close keys and
 * the key/project/language descriptions). The model is asked to answer
 * with a JSON object `{"output": ..., "contextDescription": ...}`.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::language_utils::language_name_or_tag;
use crate::model::{ExampleItem, Formality};

use super::ProviderParams;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap()
});

/// System prompt template for string translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for software string translation.
    pub const STRING_TRANSLATOR: &'static str = r#"You are a professional translator of software user interfaces, translating from {source_language} to {target_language}.

## Rules
- Translate the text naturally, matching the tone of the examples
- Keep every token of the form {xx0}, {xx1}, ... exactly as it appears
- Keep HTML tags and line breaks
- Follow the terminology of the provided examples and related strings

## Output Requirements
- Return ONLY a JSON object: {"output": "<translation>", "contextDescription": "<short note on the context you assumed>"}
- Do not include any text outside the JSON object"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn string_translator() -> Self {
        Self::new(Self::STRING_TRANSLATOR)
    }

    /// Render the template with the given language names.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::string_translator()
    }
}

/// System and user prompt for one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPrompt {
    pub system: String,
    pub user: String,
}

/// Builds prompts from provider parameters
#[derive(Debug, Clone, Default)]
pub struct TranslationPromptBuilder {
    template: PromptTemplate,
}

impl TranslationPromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    pub fn build(&self, params: &ProviderParams) -> TranslationPrompt {
        let source = language_name_or_tag(&params.source_tag);
        let target = language_name_or_tag(&params.target_tag);
        let system = self.template.render(&source, &target);

        let mut user = String::new();

        if let Some(metadata) = &params.metadata {
            if let Some(project) = non_blank(&metadata.project_description) {
                user.push_str(&format!("## Project\n{}\n\n", project));
            }
            if let Some(language) = non_blank(&metadata.language_description) {
                user.push_str(&format!("## Notes for {}\n{}\n\n", target, language));
            }
            if let Some(key) = non_blank(&metadata.key_description) {
                user.push_str(&format!("## String description\n{}\n\n", key));
            }
            push_examples(&mut user, "## Similar translations", &metadata.examples);
            push_examples(&mut user, "## Related strings", &metadata.close_items);
        }

        match params.formality {
            Some(Formality::Formal) => user.push_str("Use a formal register.\n\n"),
            Some(Formality::Informal) => user.push_str("Use an informal register.\n\n"),
            _ => {}
        }

        if let Some(key_name) = &params.key_name {
            user.push_str(&format!("## Key\n{}\n\n", key_name));
        }

        user.push_str(&format!("## Text to translate\n{}", params.text));

        TranslationPrompt { system, user }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn push_examples(prompt: &mut String, heading: &str, items: &[ExampleItem]) {
    if items.is_empty() {
        return;
    }

    prompt.push_str(heading);
    prompt.push('\n');
    for item in items {
        if item.target.is_empty() {
            prompt.push_str(&format!("- {}: \"{}\"\n", item.key, item.source));
        } else {
            prompt.push_str(&format!("- {}: \"{}\" -> \"{}\"\n", item.key, item.source, item.target));
        }
    }
    prompt.push('\n');
}

/// JSON answer expected from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnswer {
    pub output: String,
    #[serde(default)]
    pub context_description: Option<String>,
}

/// Parse a model answer, tolerating code fences and surrounding prose
pub fn parse_answer(raw: &str) -> Result<LlmAnswer, ProviderError> {
    let unfenced = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let json = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => {
            return Err(ProviderError::ParseError(format!(
                "No JSON object in model answer: {}",
                raw.chars().take(200).collect::<String>()
            )));
        }
    };

    serde_json::from_str(json).map_err(|e| ProviderError::ParseError(e.to_string()))
}
