/*!
 * # polyglot-mt - Machine translation orchestration for localization projects
 *
 * A Rust library that translates the strings of a localization project
 * through several machine translation services.
 *
 * ## Features
 *
 * - Translate one text into one language with every enabled service
 * - Translate a key into many languages with each language's primary
 *   service, one provider call per service
 * - ICU placeholder protection around provider calls
 * - Translation memory examples, close-key translations and descriptions
 *   for prompt-based services
 * - Lifecycle events carrying the cost of every call
 * - Retry classification for background batch chunks
 * - Providers:
 *   - Google Cloud Translation
 *   - DeepL
 *   - Anthropic (prompt-based)
 *   - Ollama (local LLM, prompt-based)
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `model`: Shared domain types
 * - `translation`: Orchestration:
 *   - `translation::core`: The `MtService` orchestrator
 *   - `translation::selector`: Service resolution per language
 *   - `translation::metadata`: Contextual hints for prompt-based services
 *   - `translation::params`: ICU placeholder protection
 *   - `translation::events`: Lifecycle notifications
 *   - `translation::cache`: Provider result cache
 * - `providers`: Provider adapters and the `MtServiceManager` transport
 * - `batch`: Chunk processing and retry classification
 * - `database`: SQLite catalog of projects, languages, keys and translations
 * - `language_utils`: BCP 47 tag utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod batch;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod model;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use batch::{ChunkFailure, ChunkReport, ChunkState, MtChunkProcessor, RetryPolicy};
pub use database::Repository;
pub use errors::{AppError, MtError, MtResult, ProviderError};
pub use model::{KeyRef, LanguageRef, Metadata, MtServiceInfo, MtServiceType, ProjectRef, TranslateResult};
pub use providers::manager::MtServiceManager;
pub use translation::MtService;
