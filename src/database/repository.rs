/*!
 * Repository layer for database operations.
 *
 * `Repository` is the SQLite-backed catalog: it stores projects, languages,
 * keys, translations and close-key pairs, and implements every lookup the
 * orchestrator consumes.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::model::{KeyRef, LanguageRef};
use crate::translation::fuzzy::SimilarityScorer;
use crate::translation::lookup::{
    CloseKeyIndex, ProjectCatalog, StoredTranslation, TranslationLookup, TranslationMemory,
    TranslationMemoryItem, TranslationWriter,
};

use super::connection::DatabaseConnection;
use super::models::{KeyRecord, LanguageRecord, ProjectRecord};

const LANGUAGE_COLUMNS: &str = "id, project_id, tag, name, ai_description, is_base";
const KEY_COLUMNS: &str = "id, project_id, name, description";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
    /// Ranks translation memory candidates
    scorer: SimilarityScorer,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            scorer: SimilarityScorer::default(),
        }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Override the translation memory similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.scorer = SimilarityScorer::new(threshold);
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Project Operations
    // =========================================================================

    /// Insert or update a project
    pub async fn save_project(&self, project: &ProjectRecord) -> Result<()> {
        let project = project.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO projects (id, organization_id, ai_description)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        organization_id = excluded.organization_id,
                        ai_description = excluded.ai_description
                    "#,
                    params![project.id, project.organization_id, project.ai_description],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_project(&self, project_id: i64) -> Result<Option<ProjectRecord>> {
        self.db
            .execute_async(move |conn| {
                let project = conn
                    .query_row(
                        "SELECT id, organization_id, ai_description FROM projects WHERE id = ?1",
                        [project_id],
                        |row| {
                            Ok(ProjectRecord {
                                id: row.get(0)?,
                                organization_id: row.get(1)?,
                                ai_description: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(project)
            })
            .await
    }

    // =========================================================================
    // Language Operations
    // =========================================================================

    /// Add a language to a project, returning it with its assigned id
    pub async fn add_language(&self, language: &LanguageRecord) -> Result<LanguageRecord> {
        let mut language = language.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO languages (project_id, tag, name, ai_description, is_base)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        language.project_id,
                        language.tag,
                        language.name,
                        language.ai_description,
                        language.is_base,
                    ],
                )
                .with_context(|| format!("Failed to add language {}", language.tag))?;

                language.id = conn.last_insert_rowid();
                debug!("Added language {} with id {}", language.tag, language.id);
                Ok(language)
            })
            .await
    }

    /// All languages of a project, base language first
    pub async fn get_languages(&self, project_id: i64) -> Result<Vec<LanguageRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM languages WHERE project_id = ?1 ORDER BY is_base DESC, id",
                    LANGUAGE_COLUMNS
                ))?;
                let languages = stmt
                    .query_map([project_id], parse_language_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(languages)
            })
            .await
    }

    pub async fn find_language_by_tag(&self, project_id: i64, tag: &str) -> Result<Option<LanguageRecord>> {
        let tag = tag.to_string();

        self.db
            .execute_async(move |conn| {
                let language = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM languages WHERE project_id = ?1 AND tag = ?2",
                            LANGUAGE_COLUMNS
                        ),
                        params![project_id, tag],
                        parse_language_row,
                    )
                    .optional()?;
                Ok(language)
            })
            .await
    }

    // =========================================================================
    // Key Operations
    // =========================================================================

    /// Add a key to a project, returning it with its assigned id
    pub async fn add_key(&self, key: &KeyRecord) -> Result<KeyRecord> {
        let mut key = key.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO keys (project_id, name, description) VALUES (?1, ?2, ?3)",
                    params![key.project_id, key.name, key.description],
                )
                .with_context(|| format!("Failed to add key {}", key.name))?;

                key.id = conn.last_insert_rowid();
                Ok(key)
            })
            .await
    }

    pub async fn find_key_by_name(&self, project_id: i64, name: &str) -> Result<Option<KeyRecord>> {
        let name = name.to_string();

        self.db
            .execute_async(move |conn| {
                let key = conn
                    .query_row(
                        &format!("SELECT {} FROM keys WHERE project_id = ?1 AND name = ?2", KEY_COLUMNS),
                        params![project_id, name],
                        parse_key_row,
                    )
                    .optional()?;
                Ok(key)
            })
            .await
    }

    pub async fn get_keys(&self, project_id: i64) -> Result<Vec<KeyRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM keys WHERE project_id = ?1 ORDER BY id",
                    KEY_COLUMNS
                ))?;
                let keys = stmt
                    .query_map([project_id], parse_key_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(keys)
            })
            .await
    }

    /// Mark two keys as appearing close to each other
    pub async fn add_close_keys(&self, key_id: i64, close_key_id: i64) -> Result<()> {
        self.db
            .transaction_async(move |tx| {
                for (a, b) in [(key_id, close_key_id), (close_key_id, key_id)] {
                    tx.execute(
                        "INSERT OR IGNORE INTO close_keys (key_id, close_key_id) VALUES (?1, ?2)",
                        params![a, b],
                    )?;
                }
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Translation Operations
    // =========================================================================

    /// Insert or replace the translation of a key
    pub async fn set_translation(&self, key_id: i64, language_id: i64, text: Option<&str>) -> Result<()> {
        let text = text.map(str::to_string);
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (key_id, language_id, text, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key_id, language_id) DO UPDATE SET
                        text = excluded.text,
                        updated_at = excluded.updated_at
                    "#,
                    params![key_id, language_id, text, now],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_translation(&self, key_id: i64, language_id: i64) -> Result<Option<String>> {
        self.db
            .execute_async(move |conn| {
                let text: Option<Option<String>> = conn
                    .query_row(
                        "SELECT text FROM translations WHERE key_id = ?1 AND language_id = ?2",
                        params![key_id, language_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(text.flatten())
            })
            .await
    }

    fn base_language_sync(conn: &Connection, project_id: i64) -> Result<Option<LanguageRecord>> {
        let language = conn
            .query_row(
                &format!(
                    "SELECT {} FROM languages WHERE project_id = ?1 AND is_base = 1",
                    LANGUAGE_COLUMNS
                ),
                [project_id],
                parse_language_row,
            )
            .optional()?;
        Ok(language)
    }
}

fn parse_language_row(row: &Row) -> rusqlite::Result<LanguageRecord> {
    Ok(LanguageRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        tag: row.get(2)?,
        name: row.get(3)?,
        ai_description: row.get(4)?,
        is_base: row.get(5)?,
    })
}

fn parse_key_row(row: &Row) -> rusqlite::Result<KeyRecord> {
    Ok(KeyRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[async_trait]
impl ProjectCatalog for Repository {
    async fn project_base_language(&self, project_id: i64) -> Result<Option<LanguageRef>> {
        self.db
            .execute_async(move |conn| {
                Ok(Self::base_language_sync(conn, project_id)?.map(|l| l.to_ref()))
            })
            .await
    }

    async fn existing_translation(&self, key_id: i64, language_id: i64) -> Result<Option<String>> {
        self.get_translation(key_id, language_id).await
    }

    async fn find_key(&self, project_id: i64, key_id: i64) -> Result<Option<KeyRef>> {
        self.db
            .execute_async(move |conn| {
                let key = conn
                    .query_row(
                        &format!("SELECT {} FROM keys WHERE project_id = ?1 AND id = ?2", KEY_COLUMNS),
                        params![project_id, key_id],
                        parse_key_row,
                    )
                    .optional()?;
                Ok(key.map(|k| k.to_ref()))
            })
            .await
    }
}

#[async_trait]
impl TranslationMemory for Repository {
    async fn find_similar(
        &self,
        project_id: i64,
        text: &str,
        target_language: &LanguageRef,
        limit: usize,
    ) -> Result<Vec<TranslationMemoryItem>> {
        let target_language_id = target_language.id;

        let candidates = self
            .db
            .execute_async(move |conn| {
                let Some(base) = Self::base_language_sync(conn, project_id)? else {
                    return Ok(Vec::new());
                };

                let mut stmt = conn.prepare(
                    r#"
                    SELECT k.id, k.name, source.text, target.text
                    FROM keys k
                    JOIN translations source ON source.key_id = k.id AND source.language_id = ?2
                    JOIN translations target ON target.key_id = k.id AND target.language_id = ?3
                    WHERE k.project_id = ?1
                      AND source.text IS NOT NULL AND source.text != ''
                      AND target.text IS NOT NULL AND target.text != ''
                    ORDER BY k.id
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![project_id, base.id, target_language_id], |row| {
                        Ok(TranslationMemoryItem {
                            key_id: row.get(0)?,
                            key_name: row.get(1)?,
                            base_text: row.get(2)?,
                            target_text: row.get(3)?,
                            similarity: 0.0,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        let ranked = self
            .scorer
            .rank(text, candidates, |item| item.base_text.as_str(), limit)
            .into_iter()
            .map(|(item, similarity)| TranslationMemoryItem { similarity, ..item })
            .collect::<Vec<_>>();

        debug!(
            "Translation memory found {} match(es) for {}",
            ranked.len(),
            target_language.tag
        );
        Ok(ranked)
    }
}

#[async_trait]
impl CloseKeyIndex for Repository {
    async fn close_key_ids(&self, key_id: i64) -> Result<Vec<i64>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT close_key_id FROM close_keys WHERE key_id = ?1 ORDER BY close_key_id",
                )?;
                let ids = stmt
                    .query_map([key_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?;
                Ok(ids)
            })
            .await
    }
}

#[async_trait]
impl TranslationLookup for Repository {
    async fn translations_for_keys(
        &self,
        key_ids: &[i64],
        language_ids: &[i64],
    ) -> Result<Vec<StoredTranslation>> {
        if key_ids.is_empty() || language_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT t.key_id, k.name, t.language_id, t.text
            FROM translations t
            JOIN keys k ON k.id = t.key_id
            WHERE t.key_id IN ({}) AND t.language_id IN ({})
            ORDER BY t.key_id, t.language_id
            "#,
            placeholders(key_ids.len()),
            placeholders(language_ids.len())
        );
        let values: Vec<i64> = key_ids.iter().chain(language_ids).copied().collect();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(values), |row| {
                        Ok(StoredTranslation {
                            key_id: row.get(0)?,
                            key_name: row.get(1)?,
                            language_id: row.get(2)?,
                            text: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }
}

#[async_trait]
impl TranslationWriter for Repository {
    async fn save_translation(&self, key_id: i64, language_id: i64, text: &str) -> Result<()> {
        self.set_translation(key_id, language_id, Some(text)).await
    }
}
