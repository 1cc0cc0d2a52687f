/*!
 * Database module for the translation catalog.
 *
 * This module provides SQLite-based persistence for:
 * - Projects, their languages and keys
 * - Translations, used as base texts, translation memory and batch output
 * - Close-key pairs feeding contextual hints
 *
 * Catalogs are loaded from JSON files through `import`.
 */

pub mod schema;
pub mod import;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use import::{CatalogFile, ImportSummary};
pub use models::{KeyRecord, LanguageRecord, ProjectRecord};
pub use repository::Repository;
