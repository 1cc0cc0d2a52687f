use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::MtError;
use crate::model::{LanguageRef, ProjectRef};
use crate::translation::core::MtService;
use crate::translation::lookup::{ProjectCatalog, TranslationWriter};

use super::failure::{ChunkFailure, RetryPolicy};
use super::state::ChunkState;

/// Result of a fully processed chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Keys handled so far, in processing order
    pub processed_keys: Vec<i64>,
    /// Distinct (key, language) translations written; rewrites by a requeued run count once
    pub translations_saved: usize,
    /// (key id, language id) pairs behind `translations_saved`
    pub saved_pairs: BTreeSet<(i64, i64)>,
    /// Credits spent by the chunk
    pub total_price: u64,
}

/// Translates one chunk of keys with each language's primary service
///
/// The first failure stops the chunk and is classified so an external
/// scheduler can decide whether to requeue the remaining keys.
pub struct MtChunkProcessor {
    service: Arc<MtService>,
    catalog: Arc<dyn ProjectCatalog>,
    writer: Arc<dyn TranslationWriter>,
    policy: RetryPolicy,
}

impl MtChunkProcessor {
    pub fn new(
        service: Arc<MtService>,
        catalog: Arc<dyn ProjectCatalog>,
        writer: Arc<dyn TranslationWriter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            catalog,
            writer,
            policy,
        }
    }

    /// Translate `key_ids` into `target_languages`, skipping keys already in `report`
    ///
    /// Progress is accumulated into `report` so a requeued run resumes where
    /// the failed one stopped.
    pub async fn process(
        &self,
        project: &ProjectRef,
        key_ids: &[i64],
        target_languages: &[LanguageRef],
        report: &mut ChunkReport,
    ) -> Result<(), ChunkFailure> {
        let pending: Vec<i64> = key_ids
            .iter()
            .copied()
            .filter(|k| !report.processed_keys.contains(k))
            .collect();

        for key_id in pending {
            let key = match self.catalog.find_key(project.id, key_id).await {
                Ok(Some(key)) => key,
                Ok(None) => {
                    warn!("Key {} no longer exists, skipping", key_id);
                    report.processed_keys.push(key_id);
                    continue;
                }
                Err(e) => {
                    return Err(self.classify(report.processed_keys.clone(), MtError::from(e)));
                }
            };

            let results = match self
                .service
                .translate_primary_for_many_languages(project, &key, target_languages, true)
                .await
            {
                Ok(results) => results,
                Err(e) => return Err(self.classify(report.processed_keys.clone(), e)),
            };

            for (language, result) in target_languages.iter().zip(results) {
                let Some(result) = result else { continue };
                report.total_price += result.actual_price;

                let Some(text) = result.translated_text else { continue };
                if let Err(e) = self.writer.save_translation(key.id, language.id, &text).await {
                    return Err(self.classify(report.processed_keys.clone(), MtError::from(e)));
                }
                if report.saved_pairs.insert((key.id, language.id)) {
                    report.translations_saved += 1;
                }
            }

            debug!("Chunk key {} translated", key.name);
            report.processed_keys.push(key.id);
        }

        Ok(())
    }

    /// Process the chunk until it is done or has failed for good
    ///
    /// Retryable failures wait for the delay chosen by the chunk's state
    /// machine and resume with the keys not processed yet.
    pub async fn run(
        &self,
        project: &ProjectRef,
        key_ids: &[i64],
        target_languages: &[LanguageRef],
    ) -> (ChunkState, ChunkReport) {
        let mut state = ChunkState::new();
        let mut report = ChunkReport::default();

        while !state.is_finished() {
            state = match self.process(project, key_ids, target_languages, &mut report).await {
                Ok(()) => state.succeed(),
                Err(failure) => state.fail(&failure),
            };

            if let Some(delay) = state.pending_delay() {
                info!("Requeueing chunk in {} ms", delay.as_millis());
                tokio::time::sleep(delay).await;
                state = state.resume();
            }
        }

        (state, report)
    }

    /// Turn an orchestration error into a chunk failure
    ///
    /// Rate limits, connection problems, server errors and exhausted credits
    /// may clear up later; everything else would fail the same way again.
    pub fn classify(&self, successful_targets: Vec<i64>, error: MtError) -> ChunkFailure {
        let retryable = match &error {
            MtError::Provider(provider_error) => provider_error.is_transient(),
            MtError::Lookup(_) => true,
            _ => false,
        };

        if retryable {
            warn!("Chunk failed with a retryable error: {}", error);
            ChunkFailure::retryable(successful_targets, error, self.policy)
        } else {
            warn!("Chunk failed permanently: {}", error);
            ChunkFailure::terminal(successful_targets, error)
        }
    }
}

