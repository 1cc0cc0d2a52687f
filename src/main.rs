// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info, warn};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use polyglot_mt::app_config::{Config, LogLevel};
use polyglot_mt::batch::{ChunkState, MtChunkProcessor};
use polyglot_mt::database::{CatalogFile, DatabaseConnection, Repository};
use polyglot_mt::errors::{AppError, MtError, ProviderError};
use polyglot_mt::model::{KeyRef, LanguageRef, MtServiceType, ProjectRef};
use polyglot_mt::providers::manager::MtServiceManager;
use polyglot_mt::providers::mock::MockProvider;
use polyglot_mt::translation::cache::TranslationCache;
use polyglot_mt::translation::{
    ConfigMtServiceSettings, EventBus, MetadataAssembler, MtService, UsageRecorder,
};

/// API key set on providers when running offline
const OFFLINE_API_KEY: &str = "offline";

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for MtServiceType to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliService {
    Google,
    Deepl,
    Anthropic,
    Ollama,
}

impl From<CliService> for MtServiceType {
    fn from(cli_service: CliService) -> Self {
        match cli_service {
            CliService::Google => MtServiceType::Google,
            CliService::Deepl => MtServiceType::Deepl,
            CliService::Anthropic => MtServiceType::Anthropic,
            CliService::Ollama => MtServiceType::Ollama,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load projects, languages, keys and translations from a JSON catalog
    Import {
        /// Catalog file to import
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
    },

    /// Translate a key or a text into one language with every enabled service
    Translate(TranslateArgs),

    /// Translate a key into several languages with their primary services
    Primary(PrimaryArgs),

    /// Translate keys in chunks and store the results, retrying transient failures
    Batch(BatchArgs),

    /// Generate shell completions for polyglot-mt
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Project id
    #[arg(short, long)]
    project: i64,

    /// Key name; its base translation is used unless --text is given
    #[arg(short, long)]
    key: Option<String>,

    /// Text to translate instead of the stored base translation
    #[arg(long)]
    text: Option<String>,

    /// Target language tag (e.g., 'de', 'pt-BR')
    #[arg(short, long)]
    target: String,

    /// Only use these services (all enabled services when omitted)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    service: Vec<CliService>,
}

#[derive(Parser, Debug)]
struct PrimaryArgs {
    /// Project id
    #[arg(short, long)]
    project: i64,

    /// Key name
    #[arg(short, long)]
    key: String,

    /// Target language tags, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    targets: Vec<String>,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Project id
    #[arg(short, long)]
    project: i64,

    /// Key names, comma separated (all keys of the project when omitted)
    #[arg(short, long, value_delimiter = ',')]
    keys: Vec<String>,

    /// Target language tags, comma separated (all non-base languages when omitted)
    #[arg(short, long, value_delimiter = ',')]
    targets: Vec<String>,

    /// Keys per chunk
    #[arg(long, default_value_t = 10)]
    chunk_size: usize,
}

/// polyglot-mt - Machine translation for localization projects
///
/// Translates the keys of a localization project with Google Translate,
/// DeepL, Anthropic or a local Ollama model, protecting ICU placeholders
/// and giving prompt-based services context from the project.
#[derive(Parser, Debug)]
#[command(name = "polyglot-mt")]
#[command(version)]
#[command(about = "Machine translation for localization projects")]
#[command(long_about = "polyglot-mt translates the keys of a localization project with machine translation services.

EXAMPLES:
    polyglot-mt import catalog.json                          # Load a project catalog
    polyglot-mt translate -p 1 -k greeting -t de             # All enabled services
    polyglot-mt translate -p 1 --text 'Hi {name}' -t fr -s deepl
    polyglot-mt primary -p 1 -k greeting -t de,fr,cs         # Primary service per language
    polyglot-mt batch -p 1 -t de,fr                          # Translate and store every key
    polyglot-mt --offline primary -p 1 -k greeting -t de     # Use the mock provider
    polyglot-mt completions bash > polyglot-mt.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED SERVICES:
    google    - Google Cloud Translation v2 (requires API key)
    deepl     - DeepL API v2 (requires API key)
    anthropic - Anthropic Messages API (requires API key)
    ollama    - Local Ollama server (default: llama3.2:3b)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Database file (overrides the configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Answer with the mock provider instead of contacting services
    #[arg(long, global = true)]
    offline: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and color for log level
    fn decoration_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration_for_level(record.level());

            // stdout carries the JSON output, logs go to stderr
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Everything a command needs, wired from the configuration
struct AppContext {
    config: Config,
    repository: Repository,
    service: Arc<MtService>,
    usage: Arc<UsageRecorder>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    CustomLogger::init(LevelFilter::Trace).map_err(|e| AppError::Unknown(e.to_string()))?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    if let Err(error) = run(&cli).await.map_err(into_app_error) {
        error!("{}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: &CommandLineOptions) -> Result<()> {
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "polyglot-mt", &mut std::io::stdout());
            Ok(())
        }
        Commands::Import { catalog } => {
            let config = load_config(cli)?;
            let repository = open_repository(cli, &config)?;
            let catalog = CatalogFile::from_file(catalog)?;
            let summary = repository.import_catalog(&catalog).await?;
            print_json(&json!({
                "project": catalog.project.id,
                "languagesAdded": summary.languages,
                "keysAdded": summary.keys,
                "translationsWritten": summary.translations,
            }))
        }
        Commands::Translate(args) => {
            let context = build_context(cli)?;
            run_translate(&context, args).await
        }
        Commands::Primary(args) => {
            let context = build_context(cli)?;
            run_primary(&context, args).await
        }
        Commands::Batch(args) => {
            let context = build_context(cli)?;
            run_batch(&context, args).await
        }
    }
}

/// Keep orchestration and provider failures typed on the way out
fn into_app_error(error: anyhow::Error) -> AppError {
    let error = match error.downcast::<MtError>() {
        Ok(e) => return AppError::Translation(e),
        Err(error) => error,
    };
    match error.downcast::<ProviderError>() {
        Ok(e) => AppError::Provider(e),
        Err(error) => AppError::from(error),
    }
}

/// Load the configuration with the command line overrides applied
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    if cli.offline {
        for provider in config.providers.iter_mut().filter(|p| p.api_key.is_empty()) {
            provider.api_key = OFFLINE_API_KEY.to_string();
        }
    }

    Ok(config)
}

fn open_repository(cli: &CommandLineOptions, config: &Config) -> Result<Repository> {
    let db_path = match (&cli.database, &config.database_path) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => PathBuf::from(path),
        (None, None) => DatabaseConnection::default_database_path()?,
    };
    let repository = Repository::new(DatabaseConnection::new(&db_path)?);
    debug!("Catalog: {}", repository.connection().stats()?);
    Ok(repository)
}

fn build_context(cli: &CommandLineOptions) -> Result<AppContext> {
    let config = load_config(cli)?;
    config.validate().context("Configuration validation failed")?;
    let repository = open_repository(cli, &config)?;

    let manager = Arc::new(if cli.offline {
        offline_manager(&config)
    } else {
        MtServiceManager::from_config(&config)?
    });

    let settings = ConfigMtServiceSettings::from_config(&config)
        .with_available_services(manager.available_services())
        .with_language_support(manager.clone());

    let usage = Arc::new(UsageRecorder::new());
    let events = Arc::new(EventBus::new());
    events.subscribe(usage.clone());

    let catalog = Arc::new(repository.clone());
    let metadata = MetadataAssembler::new()
        .with_memory(catalog.clone())
        .with_close_keys(catalog.clone(), catalog.clone());

    let service = MtService::new(Arc::new(settings), manager, catalog)
        .with_metadata(metadata)
        .with_events(events)
        .with_max_text_length(config.max_translation_text_length);

    Ok(AppContext {
        config,
        repository,
        service: Arc::new(service),
        usage,
    })
}

/// Mock adapters for every configured service, priced like the real ones
fn offline_manager(config: &Config) -> MtServiceManager {
    warn!("Running offline, translations come from the mock provider");

    let mut manager = MtServiceManager::new(TranslationCache::new(config.cache_enabled));
    for provider_config in &config.providers {
        let provider = MockProvider::working()
            .with_service_type(provider_config.service_type)
            .with_price_per_char(provider_config.price_per_char);
        manager.register_with_pricing(Arc::new(provider), provider_config.batch_price_percent);
    }
    manager
}

async fn run_translate(context: &AppContext, args: &TranslateArgs) -> Result<()> {
    let project = load_project(context, args.project).await?;
    let target = load_language(context, args.project, &args.target).await?;

    let key = match &args.key {
        Some(name) => Some(load_key(context, args.project, name).await?),
        None if args.text.is_none() => return Err(anyhow!("Either --key or --text is required")),
        None => None,
    };

    let desired: Vec<MtServiceType> = args.service.iter().copied().map(Into::into).collect();
    let desired = (!desired.is_empty()).then_some(desired.as_slice());

    let results = context
        .service
        .translate_for_one_language(&project, key.as_ref(), args.text.as_deref(), &target, desired)
        .await?;

    print_json(&json!({
        "results": serde_json::to_value(&results)?,
        "spent": context.usage.spent(project.organization_owner_id),
    }))
}

async fn run_primary(context: &AppContext, args: &PrimaryArgs) -> Result<()> {
    let project = load_project(context, args.project).await?;
    let key = load_key(context, args.project, &args.key).await?;

    let mut targets = Vec::with_capacity(args.targets.len());
    for tag in &args.targets {
        targets.push(load_language(context, args.project, tag).await?);
    }

    let results = context
        .service
        .translate_primary_for_many_languages(&project, &key, &targets, false)
        .await?;

    let by_tag: serde_json::Map<String, serde_json::Value> = targets
        .iter()
        .zip(&results)
        .map(|(language, result)| -> Result<(String, serde_json::Value)> {
            Ok((language.tag.clone(), serde_json::to_value(result)?))
        })
        .collect::<Result<_>>()?;

    print_json(&json!({
        "key": key.name,
        "results": by_tag,
        "spent": context.usage.spent(project.organization_owner_id),
    }))
}

async fn run_batch(context: &AppContext, args: &BatchArgs) -> Result<()> {
    let project = load_project(context, args.project).await?;

    let key_ids: Vec<i64> = if args.keys.is_empty() {
        context.repository.get_keys(args.project).await?.into_iter().map(|k| k.id).collect()
    } else {
        let mut ids = Vec::with_capacity(args.keys.len());
        for name in &args.keys {
            ids.push(load_key(context, args.project, name).await?.id);
        }
        ids
    };

    let targets: Vec<LanguageRef> = if args.targets.is_empty() {
        context
            .repository
            .get_languages(args.project)
            .await?
            .into_iter()
            .filter(|l| !l.is_base)
            .map(|l| l.to_ref())
            .collect()
    } else {
        let mut languages = Vec::with_capacity(args.targets.len());
        for tag in &args.targets {
            languages.push(load_language(context, args.project, tag).await?);
        }
        languages
    };

    let catalog = Arc::new(context.repository.clone());
    let processor = MtChunkProcessor::new(
        context.service.clone(),
        catalog.clone(),
        catalog,
        context.config.retry_policy(),
    );

    let chunks: Vec<&[i64]> = key_ids.chunks(args.chunk_size.max(1)).collect();
    let progress_bar = ProgressBar::new(chunks.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style);
    progress_bar.set_message("Translating");

    info!(
        "Translating {} key(s) into {} language(s) in {} chunk(s)",
        key_ids.len(),
        targets.len(),
        chunks.len()
    );

    let mut failed = Vec::new();
    let mut translations_saved = 0;
    let mut total_price = 0;
    for (index, chunk) in chunks.iter().enumerate() {
        let (state, report) = processor.run(&project, chunk, &targets).await;
        translations_saved += report.translations_saved;
        total_price += report.total_price;

        if let ChunkState::Failed { reason } = state {
            progress_bar.suspend(|| warn!("Chunk {} failed: {}", index + 1, reason));
            failed.push(json!({ "chunk": index + 1, "processedKeys": report.processed_keys.len(), "reason": reason }));
        }
        progress_bar.inc(1);
    }
    progress_bar.finish_and_clear();

    print_json(&json!({
        "chunks": chunks.len(),
        "failed": failed,
        "translationsSaved": translations_saved,
        "totalPrice": total_price,
    }))
}

async fn load_project(context: &AppContext, project_id: i64) -> Result<ProjectRef> {
    context
        .repository
        .get_project(project_id)
        .await?
        .map(|p| p.to_ref())
        .ok_or_else(|| anyhow!("Project {} not found", project_id))
}

async fn load_language(context: &AppContext, project_id: i64, tag: &str) -> Result<LanguageRef> {
    context
        .repository
        .find_language_by_tag(project_id, tag)
        .await?
        .map(|l| l.to_ref())
        .ok_or_else(|| anyhow!("Language {} not found in project {}", tag, project_id))
}

async fn load_key(context: &AppContext, project_id: i64, name: &str) -> Result<KeyRef> {
    context
        .repository
        .find_key_by_name(project_id, name)
        .await?
        .map(|k| k.to_ref())
        .ok_or_else(|| anyhow!("Key {} not found in project {}", name, project_id))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}
