/*!
 * Per-language machine translation settings.
 *
 * `MtServiceConfig` is the configuration lookup the orchestrator consumes.
 * `ConfigMtServiceSettings` answers it from the JSON configuration: a
 * language override matching the most specific tag wins, otherwise the
 * project-wide defaults apply. Services without a usable provider, or whose
 * provider cannot translate into the language, are never reported.
 */

use std::collections::HashSet;
use std::sync::Arc;

use crate::app_config::{Config, LanguageMtConfig};
use crate::language_utils::tag_fallbacks;
use crate::model::{LanguageRef, MtServiceInfo, MtServiceType};
use crate::providers::manager::MtServiceManager;

/// Configuration lookup for enabled and primary services
pub trait MtServiceConfig: Send + Sync {
    /// Services enabled for the language, without duplicates
    fn enabled_services(&self, language: &LanguageRef) -> Vec<MtServiceInfo>;

    /// The primary service of the language, if any
    fn primary_service(&self, language: &LanguageRef) -> Option<MtServiceInfo>;
}

/// Answers language support questions for the settings
pub trait LanguageSupport: Send + Sync {
    fn supports(&self, service: MtServiceType, tag: &str) -> bool;
}

impl LanguageSupport for MtServiceManager {
    fn supports(&self, service: MtServiceType, tag: &str) -> bool {
        MtServiceManager::supports(self, service, tag)
    }
}

/// Settings backed by the JSON configuration
pub struct ConfigMtServiceSettings {
    default_enabled: Vec<MtServiceType>,
    default_primary: Option<MtServiceType>,
    languages: Vec<LanguageMtConfig>,
    usable: HashSet<MtServiceType>,
    support: Option<Arc<dyn LanguageSupport>>,
}

impl ConfigMtServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        let usable = config
            .providers
            .iter()
            .filter(|p| p.is_usable())
            .map(|p| p.service_type)
            .collect();

        Self {
            default_enabled: config.machine_translation.default_enabled_services.clone(),
            default_primary: config.machine_translation.default_primary_service,
            languages: config.machine_translation.languages.clone(),
            usable,
            support: None,
        }
    }

    /// Also drop services whose provider cannot handle the language
    pub fn with_language_support(mut self, support: Arc<dyn LanguageSupport>) -> Self {
        self.support = Some(support);
        self
    }

    /// Replace the usable services with the ones actually registered
    pub fn with_available_services(mut self, services: impl IntoIterator<Item = MtServiceType>) -> Self {
        self.usable = services.into_iter().collect();
        self
    }

    /// The override for the most specific matching tag
    fn language_override(&self, tag: &str) -> Option<&LanguageMtConfig> {
        tag_fallbacks(tag).into_iter().find_map(|candidate| {
            self.languages
                .iter()
                .find(|l| l.tag.trim().to_lowercase().replace('_', "-") == candidate)
        })
    }

    fn is_available(&self, service: MtServiceType, tag: &str) -> bool {
        self.usable.contains(&service)
            && self.support.as_ref().is_none_or(|s| s.supports(service, tag))
    }

    fn info(&self, service: MtServiceType, language: Option<&LanguageMtConfig>) -> MtServiceInfo {
        let info = MtServiceInfo::new(service);
        match language.and_then(|l| l.formality) {
            Some(formality) => info.with_formality(formality),
            None => info,
        }
    }
}

impl MtServiceConfig for ConfigMtServiceSettings {
    fn enabled_services(&self, language: &LanguageRef) -> Vec<MtServiceInfo> {
        let language_override = self.language_override(&language.tag);
        let services = match language_override {
            Some(l) => &l.enabled_services,
            None => &self.default_enabled,
        };

        let mut seen = HashSet::new();
        services
            .iter()
            .copied()
            .filter(|s| seen.insert(*s))
            .filter(|s| self.is_available(*s, &language.tag))
            .map(|s| self.info(s, language_override))
            .collect()
    }

    fn primary_service(&self, language: &LanguageRef) -> Option<MtServiceInfo> {
        let language_override = self.language_override(&language.tag);
        let primary = match language_override {
            Some(l) => l.primary_service,
            None => self.default_primary,
        }?;

        if !self.is_available(primary, &language.tag) {
            return None;
        }
        Some(self.info(primary, language_override))
    }
}
