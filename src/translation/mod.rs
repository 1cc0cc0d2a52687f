/*!
 * Machine translation orchestration.
 *
 * This module contains the orchestration layer between callers and the
 * provider transport. It is split into several submodules:
 *
 * - `core`: the `MtService` orchestrator
 * - `selector`: which services apply to a language
 * - `settings`: per-language service configuration
 * - `metadata`: contextual hints for prompt-based services
 * - `params`: ICU placeholder protection
 * - `events`: lifecycle notifications
 * - `lookup`: lookups consumed from the surrounding platform
 * - `cache`: provider result cache
 * - `fuzzy`: text similarity for translation memory
 */

// Re-export main types for easier usage
pub use self::core::MtService;
pub use self::events::{EventBus, EventPublisher, EventSubscriber, LifecycleEvent, MtEvent, UsageRecorder};
pub use self::lookup::{
    CloseKeyIndex, ProjectCatalog, StoredTranslation, TranslationLookup, TranslationMemory,
    TranslationMemoryItem, TranslationWriter,
};
pub use self::metadata::MetadataAssembler;
pub use self::settings::{ConfigMtServiceSettings, MtServiceConfig};

// Submodules
pub mod cache;
pub mod core;
pub mod events;
pub mod fuzzy;
pub mod lookup;
pub mod metadata;
pub mod params;
pub mod selector;
pub mod settings;
