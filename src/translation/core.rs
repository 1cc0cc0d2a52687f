/*!
 * Machine translation orchestrator.
 *
 * `MtService` resolves the base text and the services to use, protects ICU
 * arguments, gathers metadata for prompt-based services, calls the provider
 * transport and reassembles the results. Every call publishes a
 * before/after lifecycle event pair once it is certain providers will be
 * contacted; validation failures and blank texts publish nothing.
 */

use futures::future::try_join_all;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::slice;
use std::sync::Arc;

use crate::errors::{MtError, MtResult, ProviderError};
use crate::model::{KeyRef, LanguageRef, Metadata, MtServiceInfo, MtServiceType, ProjectRef, TranslateResult};
use crate::providers::{TranslationTransport, TransportRequest};

use super::events::{EventPublisher, MtEvent, NoopPublisher};
use super::lookup::ProjectCatalog;
use super::metadata::MetadataAssembler;
use super::params::{PreparedText, replace_params};
use super::selector::resolve_services;
use super::settings::MtServiceConfig;

/// Default longest base text accepted, in characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000;

/// Machine translation orchestrator
pub struct MtService {
    settings: Arc<dyn MtServiceConfig>,
    transport: Arc<dyn TranslationTransport>,
    catalog: Arc<dyn ProjectCatalog>,
    metadata: MetadataAssembler,
    events: Arc<dyn EventPublisher>,
    max_text_length: usize,
}

impl MtService {
    pub fn new(
        settings: Arc<dyn MtServiceConfig>,
        transport: Arc<dyn TranslationTransport>,
        catalog: Arc<dyn ProjectCatalog>,
    ) -> Self {
        Self {
            settings,
            transport,
            catalog,
            metadata: MetadataAssembler::default(),
            events: Arc::new(NoopPublisher),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataAssembler) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    /// Translate into one language with every matching service
    ///
    /// `base_text` wins over the stored base translation of `key`. A blank
    /// text yields one zero-cost blank result per service without contacting
    /// anyone.
    pub async fn translate_for_one_language(
        &self,
        project: &ProjectRef,
        key: Option<&KeyRef>,
        base_text: Option<&str>,
        target_language: &LanguageRef,
        desired_services: Option<&[MtServiceType]>,
    ) -> MtResult<BTreeMap<MtServiceType, TranslateResult>> {
        let base_language = self.base_language(project).await?;
        let services = resolve_services(self.settings.as_ref(), target_language, desired_services)?;

        let text = match base_text {
            Some(text) => Some(text.to_string()),
            None => self.stored_base_text(key, &base_language).await?,
        };

        let text = match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => {
                debug!(
                    "Base text is blank, returning {} blank result(s) for {}",
                    services.len(),
                    target_language.tag
                );
                return Ok(services
                    .iter()
                    .map(|s| (s.service_type, TranslateResult::blank(s.service_type)))
                    .collect());
            }
        };

        self.check_text_length(&text)?;
        if services.is_empty() {
            return Ok(BTreeMap::new());
        }

        self.events.publish(MtEvent::BeforeTranslation {
            organization_id: project.organization_owner_id,
        });

        let prepared = replace_params(&text);
        let needs_metadata = services.iter().any(MtServiceInfo::uses_metadata);
        let metadata = self
            .metadata
            .build(
                needs_metadata,
                project,
                &base_language,
                slice::from_ref(target_language),
                &text,
                key,
            )
            .await;

        let calls = services.iter().map(|service| {
            let request = self.request(
                &prepared,
                &text,
                key,
                &base_language,
                vec![target_language.tag.clone()],
                *service,
                metadata.as_ref(),
                false,
            );
            async move {
                let results = self.transport.translate(&request).await?;
                let result = results.into_iter().next().ok_or_else(|| {
                    ProviderError::ParseError(format!("{} returned no result", request.service.service_type))
                })?;
                Ok::<_, ProviderError>((request.service.service_type, result))
            }
        });
        let answers = try_join_all(calls).await?;

        let results: BTreeMap<MtServiceType, TranslateResult> = answers
            .into_iter()
            .map(|(service, result)| (service, restore_result(&prepared, result)))
            .collect();

        let total: u64 = results.values().map(|r| r.actual_price).sum();
        self.events.publish(MtEvent::AfterTranslation {
            organization_id: project.organization_owner_id,
            actual_price: total,
        });

        info!(
            "Translated key {} into {} with {} service(s) for {} credits",
            key.map(|k| k.name.as_str()).unwrap_or("<text>"),
            target_language.tag,
            results.len(),
            total
        );
        Ok(results)
    }

    /// Translate a key into many languages with each language's primary service
    ///
    /// The output is aligned with `target_languages`; languages without a
    /// primary service, or all languages when the key has no base text, map
    /// to `None`. Languages sharing a primary service are sent to it in a
    /// single transport call.
    pub async fn translate_primary_for_many_languages(
        &self,
        project: &ProjectRef,
        key: &KeyRef,
        target_languages: &[LanguageRef],
        is_batch: bool,
    ) -> MtResult<Vec<Option<TranslateResult>>> {
        let base_language = self.base_language(project).await?;
        let mut output: Vec<Option<TranslateResult>> = vec![None; target_languages.len()];

        let text = match self
            .stored_base_text(Some(key), &base_language)
            .await?
            .filter(|t| !t.trim().is_empty())
        {
            Some(text) => text,
            None => {
                debug!("Key {} has no base text, nothing to translate", key.name);
                return Ok(output);
            }
        };

        self.check_text_length(&text)?;

        let groups = self.group_by_primary(target_languages);
        if groups.is_empty() {
            debug!("No primary service for any of {} language(s)", target_languages.len());
            return Ok(output);
        }

        self.events.publish(MtEvent::BeforeTranslation {
            organization_id: project.organization_owner_id,
        });

        let prepared = replace_params(&text);
        let metadata_languages: Vec<LanguageRef> = groups
            .iter()
            .filter(|(service, _)| service.uses_metadata())
            .flat_map(|(_, indices)| indices.iter().map(|i| target_languages[*i].clone()))
            .collect();
        let metadata = self
            .metadata
            .build(
                !metadata_languages.is_empty(),
                project,
                &base_language,
                &metadata_languages,
                &text,
                Some(key),
            )
            .await;

        let calls = groups.iter().map(|(service, indices)| {
            let target_tags = indices.iter().map(|i| target_languages[*i].tag.clone()).collect();
            let request = self.request(
                &prepared,
                &text,
                Some(key),
                &base_language,
                target_tags,
                *service,
                metadata.as_ref(),
                is_batch,
            );
            async move {
                let results = self.transport.translate(&request).await?;
                if results.len() != indices.len() {
                    return Err(ProviderError::ParseError(format!(
                        "{} returned {} results for {} languages",
                        service.service_type,
                        results.len(),
                        indices.len()
                    )));
                }
                Ok(indices.iter().copied().zip(results).collect::<Vec<_>>())
            }
        });

        for (index, result) in try_join_all(calls).await?.into_iter().flatten() {
            output[index] = Some(restore_result(&prepared, result));
        }

        let total: u64 = output.iter().flatten().map(|r| r.actual_price).sum();
        self.events.publish(MtEvent::AfterTranslation {
            organization_id: project.organization_owner_id,
            actual_price: total,
        });

        info!(
            "Translated key {} into {} language(s) with {} provider call(s) for {} credits",
            key.name,
            output.iter().filter(|r| r.is_some()).count(),
            groups.len(),
            total
        );
        Ok(output)
    }

    async fn base_language(&self, project: &ProjectRef) -> MtResult<LanguageRef> {
        self.catalog
            .project_base_language(project.id)
            .await?
            .ok_or(MtError::BaseLanguageNotFound)
    }

    async fn stored_base_text(&self, key: Option<&KeyRef>, base_language: &LanguageRef) -> MtResult<Option<String>> {
        match key {
            Some(key) => Ok(self.catalog.existing_translation(key.id, base_language.id).await?),
            None => Ok(None),
        }
    }

    fn check_text_length(&self, text: &str) -> MtResult<()> {
        let length = text.chars().count();
        if length > self.max_text_length {
            return Err(MtError::TextTooLong {
                length,
                max: self.max_text_length,
            });
        }
        Ok(())
    }

    /// Input indices grouped by primary service, in order of first appearance
    fn group_by_primary(&self, target_languages: &[LanguageRef]) -> Vec<(MtServiceInfo, Vec<usize>)> {
        let mut groups: Vec<(MtServiceInfo, Vec<usize>)> = Vec::new();

        for (index, language) in target_languages.iter().enumerate() {
            let Some(primary) = self.settings.primary_service(language) else {
                debug!("No primary service for {}", language.tag);
                continue;
            };

            match groups.iter_mut().find(|(service, _)| *service == primary) {
                Some((_, indices)) => indices.push(index),
                None => groups.push((primary, vec![index])),
            }
        }

        groups
    }

    #[allow(clippy::too_many_arguments)]
    fn request(
        &self,
        prepared: &PreparedText,
        raw_text: &str,
        key: Option<&KeyRef>,
        base_language: &LanguageRef,
        target_tags: Vec<String>,
        service: MtServiceInfo,
        metadata: Option<&HashMap<String, Metadata>>,
        is_batch: bool,
    ) -> TransportRequest {
        let metadata = metadata.filter(|_| service.uses_metadata()).map(|all| {
            target_tags
                .iter()
                .filter_map(|tag| all.get(tag).map(|m| (tag.clone(), m.clone())))
                .collect()
        });

        TransportRequest {
            text: prepared.text.clone(),
            raw_text: raw_text.to_string(),
            key_name: key.map(|k| k.name.clone()),
            source_tag: base_language.tag.clone(),
            target_tags,
            service,
            metadata,
            is_batch,
        }
    }
}

fn restore_result(prepared: &PreparedText, mut result: TranslateResult) -> TranslateResult {
    result.translated_text = result.translated_text.map(|t| prepared.restore(&t));
    result
}
