/*!
 * Database schema and migrations.
 *
 * The catalog mirrors what the orchestrator needs from the surrounding
 * platform: projects, their languages, keys, translations and the
 * close-key relation used for contextual hints.
 *
 * Migrations are applied in order and the reached version is stored in
 * SQLite's `user_version` pragma.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::Connection;

/// Ordered migrations; entry `n` moves the schema to version `n + 1`
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE projects (
        id INTEGER PRIMARY KEY,
        organization_id INTEGER NOT NULL,
        ai_description TEXT
    );

    CREATE TABLE languages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        tag TEXT NOT NULL,
        name TEXT,
        ai_description TEXT,
        is_base INTEGER NOT NULL DEFAULT 0,
        UNIQUE(project_id, tag)
    );

    -- at most one base language per project
    CREATE UNIQUE INDEX idx_languages_base ON languages(project_id) WHERE is_base = 1;

    CREATE TABLE keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        UNIQUE(project_id, name)
    );

    CREATE TABLE translations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key_id INTEGER NOT NULL REFERENCES keys(id) ON DELETE CASCADE,
        language_id INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
        text TEXT,
        updated_at TEXT NOT NULL,
        UNIQUE(key_id, language_id)
    );

    CREATE INDEX idx_translations_language ON translations(language_id);

    -- stored in both directions
    CREATE TABLE close_keys (
        key_id INTEGER NOT NULL REFERENCES keys(id) ON DELETE CASCADE,
        close_key_id INTEGER NOT NULL REFERENCES keys(id) ON DELETE CASCADE,
        PRIMARY KEY (key_id, close_key_id)
    );
    "#,
];

/// Version a fully migrated catalog reports
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the catalog schema up to date
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Enforced per connection, not stored in the file
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        bail!(
            "Catalog schema v{} is newer than this build supports (v{})",
            current,
            SCHEMA_VERSION
        );
    }
    if current == SCHEMA_VERSION {
        debug!("Catalog schema is up to date (v{})", current);
        return Ok(());
    }

    if current == 0 {
        // WAL is a no-op for in-memory databases
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = index as i32 + 1;
        info!("Migrating catalog schema to v{}", version);
        conn.execute_batch(&format!("BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;", sql, version))
            .with_context(|| format!("Failed to migrate catalog schema to v{}", version))?;
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read catalog schema version")
}
