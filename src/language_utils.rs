/*!
 * Language utilities for BCP 47 language tag handling.
 *
 * Project languages are identified by tags such as "en", "de-DE" or
 * "zh-Hant-TW". Providers each accept a different subset of these tags,
 * so this module validates tags, derives fallbacks and maps tags to the
 * codes individual providers expect.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Return the primary language subtag ("de" for "de-DE"), lowercased
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Validate a language tag: a known ISO 639-1/639-3 primary subtag
/// followed by alphanumeric subtags of at most 8 characters
pub fn validate_language_tag(tag: &str) -> Result<()> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Language tag cannot be empty"));
    }

    let primary = primary_subtag(trimmed);
    let known = match primary.len() {
        2 => Language::from_639_1(&primary).is_some(),
        3 => Language::from_639_3(&primary).is_some(),
        _ => false,
    };

    if !known {
        return Err(anyhow!("Invalid language tag: {}", tag));
    }

    let subtags_valid = trimmed
        .split(['-', '_'])
        .skip(1)
        .all(|s| !s.is_empty() && s.len() <= 8 && s.chars().all(|c| c.is_ascii_alphanumeric()));

    if !subtags_valid {
        return Err(anyhow!("Invalid language tag: {}", tag));
    }

    Ok(())
}

/// Candidate tags from most to least specific: "zh-Hant-TW" -> ["zh-hant-tw", "zh-hant", "zh"]
pub fn tag_fallbacks(tag: &str) -> Vec<String> {
    let parts: Vec<String> = tag
        .trim()
        .split(['-', '_'])
        .filter(|p| !p.is_empty())
        .map(|p| p.to_lowercase())
        .collect();

    (1..=parts.len()).rev().map(|n| parts[..n].join("-")).collect()
}

/// Get the English language name for a tag, used in prompts
pub fn get_language_name(tag: &str) -> Result<String> {
    let primary = primary_subtag(tag);
    let lang = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Failed to get language from tag: {}", tag))?;

    Ok(lang.to_name().to_string())
}

/// Language name for prompts, falling back to the raw tag for unknown languages
pub fn language_name_or_tag(tag: &str) -> String {
    get_language_name(tag).unwrap_or_else(|_| tag.to_string())
}

/// Map a tag to the code Google Translate expects
///
/// Google only distinguishes regions/scripts for Chinese and a few
/// Portuguese/French variants; everything else uses the primary subtag.
pub fn to_google_code(tag: &str) -> String {
    let full = tag_fallbacks(tag).into_iter().next().unwrap_or_default();
    match full.as_str() {
        "zh-hant" | "zh-tw" | "zh-hk" | "zh-hant-tw" | "zh-hant-hk" => "zh-TW".to_string(),
        "zh" | "zh-hans" | "zh-cn" | "zh-hans-cn" => "zh-CN".to_string(),
        "pt-pt" => "pt-PT".to_string(),
        "fr-ca" => "fr-CA".to_string(),
        _ => primary_subtag(tag),
    }
}

/// Map a tag to the code DeepL expects
///
/// DeepL source languages are bare primary codes; targets distinguish
/// English and Portuguese variants.
pub fn to_deepl_code(tag: &str, is_target: bool) -> String {
    let primary = primary_subtag(tag).to_uppercase();
    if !is_target {
        return primary;
    }

    let full = tag_fallbacks(tag).into_iter().next().unwrap_or_default();
    match full.as_str() {
        "en" | "en-us" => "EN-US".to_string(),
        "en-gb" | "en-au" | "en-ie" | "en-nz" => "EN-GB".to_string(),
        "pt" | "pt-br" => "PT-BR".to_string(),
        "pt-pt" => "PT-PT".to_string(),
        "zh-hant" | "zh-tw" | "zh-hant-tw" => "ZH-HANT".to_string(),
        _ => primary,
    }
}
