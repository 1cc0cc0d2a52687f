/*!
 * Catalog import from JSON.
 *
 * A catalog file describes one project with its languages, keys, existing
 * translations and close-key pairs. Importing is idempotent for the
 * project row and translations; languages and keys are added when missing.
 */

use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::models::{KeyRecord, LanguageRecord, ProjectRecord};
use super::repository::Repository;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub project: ProjectEntry,
    pub languages: Vec<LanguageEntry>,
    #[serde(default)]
    pub keys: Vec<KeyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub id: i64,
    pub organization_id: i64,
    #[serde(default)]
    pub ai_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ai_description: Option<String>,
    #[serde(default)]
    pub base: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Text per language tag
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
    /// Names of keys shown next to this one
    #[serde(default)]
    pub close_keys: Vec<String>,
}

/// What an import added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub languages: usize,
    pub keys: usize,
    pub translations: usize,
}

impl CatalogFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }

    /// Check the file is consistent before touching the database
    pub fn validate(&self) -> Result<()> {
        let base_count = self.languages.iter().filter(|l| l.base).count();
        if base_count != 1 {
            return Err(anyhow!("Catalog must declare exactly one base language, found {}", base_count));
        }

        for key in &self.keys {
            if let Some(tag) = key
                .translations
                .keys()
                .find(|tag| !self.languages.iter().any(|l| &l.tag == *tag))
            {
                return Err(anyhow!("Key {} has a translation for undeclared language {}", key.name, tag));
            }
            if let Some(close) = key
                .close_keys
                .iter()
                .find(|name| !self.keys.iter().any(|k| &k.name == *name))
            {
                return Err(anyhow!("Key {} refers to unknown close key {}", key.name, close));
            }
        }
        Ok(())
    }
}

impl Repository {
    /// Load a catalog file into the database
    pub async fn import_catalog(&self, catalog: &CatalogFile) -> Result<ImportSummary> {
        catalog.validate()?;
        let project_id = catalog.project.id;
        let mut summary = ImportSummary::default();

        let mut project = ProjectRecord::new(project_id, catalog.project.organization_id);
        project.ai_description = catalog.project.ai_description.clone();
        self.save_project(&project).await?;

        let mut language_ids: HashMap<String, i64> = HashMap::new();
        for entry in &catalog.languages {
            let language = match self.find_language_by_tag(project_id, &entry.tag).await? {
                Some(existing) => existing,
                None => {
                    summary.languages += 1;
                    self.add_language(&LanguageRecord {
                        id: 0,
                        project_id,
                        tag: entry.tag.clone(),
                        name: entry.name.clone(),
                        ai_description: entry.ai_description.clone(),
                        is_base: entry.base,
                    })
                    .await?
                }
            };
            language_ids.insert(entry.tag.clone(), language.id);
        }

        let mut key_ids: HashMap<String, i64> = HashMap::new();
        for entry in &catalog.keys {
            let key = match self.find_key_by_name(project_id, &entry.name).await? {
                Some(existing) => existing,
                None => {
                    summary.keys += 1;
                    let mut key = KeyRecord::new(project_id, entry.name.clone());
                    key.description = entry.description.clone();
                    self.add_key(&key).await?
                }
            };
            key_ids.insert(entry.name.clone(), key.id);

            for (tag, text) in &entry.translations {
                if let Some(language_id) = language_ids.get(tag) {
                    self.set_translation(key.id, *language_id, Some(text)).await?;
                    summary.translations += 1;
                }
            }
        }

        for entry in &catalog.keys {
            for close in &entry.close_keys {
                if let (Some(a), Some(b)) = (key_ids.get(&entry.name), key_ids.get(close)) {
                    self.add_close_keys(*a, *b).await?;
                }
            }
        }

        info!(
            "Imported project {}: {} language(s), {} key(s), {} translation(s)",
            project_id, summary.languages, summary.keys, summary.translations
        );
        Ok(summary)
    }
}
