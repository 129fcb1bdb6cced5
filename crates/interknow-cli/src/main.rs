//! InterKnow CLI - cross-disciplinary concept graphs from the command line

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use interknow_core::cache::CacheCoordinator;
use interknow_core::config::Config;
use interknow_core::llm::{ChatTurn, LlmClient, TextGenerator};
use interknow_core::storage::{ConceptStore, Database, InMemoryConceptStore, SqliteConceptStore};
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "interknow")]
#[command(author, version, about = "Cross-disciplinary knowledge graphs for any concept", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a concept to its knowledge graph (cached after the first call)
    Resolve {
        /// Concept to expand, e.g. "熵"
        concept: String,
        /// Use an in-memory store instead of the SQLite database
        #[arg(long)]
        memory: bool,
    },

    /// Ask the model a free-form question
    Chat {
        /// Message to send
        message: String,
        /// JSON file of prior turns, e.g. [{"role": "user", "text": "..."}]
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Show aggregate token and request counters
    Usage,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset to defaults
    Reset,
    /// Show the config file path
    Path,
}


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("interknow=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve { concept, memory } => {
            cmd_resolve(&concept, memory, cli.format, cli.quiet).await
        }
        Commands::Chat { message, history } => {
            cmd_chat(&message, history.as_deref(), cli.format, cli.quiet).await
        }
        Commands::Usage => cmd_usage(cli.format).await,
        Commands::Config { action } => cmd_config(action, cli.format, cli.quiet),
        Commands::Doctor => cmd_doctor(cli.format, cli.quiet).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if let Some(hint) = e
            .downcast_ref::<interknow_core::Error>()
            .and_then(|e| e.suggestion())
        {
            eprintln!("  Try: {}", hint);
        }
        std::process::exit(1);
    }
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ConceptStore>> {
    let db = Database::open(config.database_path()?).await?;
    Ok(Arc::new(SqliteConceptStore::from_database(&db)))
}

async fn cmd_resolve(
    concept: &str,
    memory: bool,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    let generator: Arc<dyn TextGenerator> = Arc::new(LlmClient::from_config(&config.llm)?);
    let store: Arc<dyn ConceptStore> = if memory {
        Arc::new(InMemoryConceptStore::new())
    } else {
        open_store(&config).await?
    };

    let coordinator = CacheCoordinator::from_config(&config, generator, store)?;
    let warmed = coordinator.warm().await?;
    if !quiet {
        info!(concepts = warmed, "Cache ready");
    }

    let graph = coordinator.resolve(concept).await;
    for warning in &graph.warnings {
        warn!(concept = %concept.trim(), "{}", warning);
    }

    let view = graph.to_view();
    let rendered = match format {
        OutputFormat::Text => serde_json::to_string_pretty(&view)?,
        OutputFormat::Json => serde_json::to_string(&view)?,
    };
    println!("{}", rendered);
    Ok(())
}

fn load_history(path: &Path) -> anyhow::Result<Vec<ChatTurn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid history file {}", path.display()))
}

async fn cmd_chat(
    message: &str,
    history: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let history = match history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let client = LlmClient::from_config(&config.llm)?;
    let reply = client.chat(message, &history).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", json!({"reply": reply.text, "usage": reply.usage}));
        }
        OutputFormat::Text => {
            println!("{}", reply.text);
            if !quiet {
                println!();
                println!(
                    "[tokens: {} prompt, {} completion, {} total]",
                    reply.usage.prompt_tokens,
                    reply.usage.completion_tokens,
                    reply.usage.total()
                );
            }
        }
    }
    Ok(())
}

async fn cmd_usage(format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = open_store(&config).await?;

    let totals = store.usage_totals().await?;
    let concepts = store.count().await?;

    match format {
        OutputFormat::Json => {
            let out = json!({
                "total_tokens": totals.total_tokens,
                "total_counts": totals.total_counts,
                "cached_concepts": concepts,
            });
            println!("{}", out);
        }
        OutputFormat::Text => {
            println!("Usage");
            println!("=====");
            println!("  Tokens spent:     {}", totals.total_tokens);
            println!("  Resolutions:      {}", totals.total_counts);
            println!("  Cached concepts:  {}", concepts);
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = items
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect();
                    println!("{}", serde_json::Value::Object(map));
                }
                OutputFormat::Text => {
                    for (key, value) in items {
                        println!("{} = {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// One line of the health report
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

async fn database_check(path: &Path) -> Check {
    let db = match Database::open(path).await {
        Ok(db) => db,
        Err(e) => return Check::failed("Database", format!("{:#}", e)),
    };
    if let Err(e) = db.health_check().await {
        return Check::failed("Database", format!("{:#}", e));
    }
    let status = match db.migration_status().await {
        Ok(status) => status,
        Err(e) => return Check::failed("Database", format!("{:#}", e)),
    };
    match SqliteConceptStore::from_database(&db).count().await {
        Ok(concepts) => Check::ok(
            "Database",
            format!(
                "{} (schema v{}, {} cached concepts)",
                path.display(),
                status.current_version,
                concepts
            ),
        ),
        Err(e) => Check::failed("Database", e.to_string()),
    }
}

async fn cmd_doctor(format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let mut checks = Vec::new();

    let config = match Config::load() {
        Ok(config) => {
            checks.push(Check::ok("Configuration", "Valid"));
            Some(config)
        }
        Err(e) => {
            checks.push(Check::failed("Configuration", e.to_string()));
            None
        }
    };

    match Config::config_path() {
        Ok(path) if path.exists() => checks.push(Check::ok("Config file", path.display().to_string())),
        Ok(path) => checks.push(Check::ok(
            "Config file",
            format!("{} (using defaults)", path.display()),
        )),
        Err(e) => checks.push(Check::failed("Config file", e.to_string())),
    }

    if let Some(config) = &config {
        match config.llm.redacted_api_key() {
            Ok(Some(redacted)) => checks.push(Check::ok("API Key", format!("Configured ({})", redacted))),
            Ok(None) => checks.push(Check::failed(
                "API Key",
                "Not configured. Set INTERKNOW_API_KEY or VOLC_ARK_API_KEY",
            )),
            Err(e) => checks.push(Check::failed("API Key", e.to_string())),
        }

        checks.push(Check::ok(
            "Model",
            format!("{} @ {}", config.llm.resolved_model(), config.llm.base_url),
        ));

        match interknow_core::filter::MembershipFilter::from_config(&config.filter) {
            Ok(filter) => checks.push(Check::ok(
                "Filter",
                format!(
                    "{} bits, {} hash rounds ({} bytes)",
                    filter.bit_len(),
                    filter.hash_rounds(),
                    filter.memory_usage()
                ),
            )),
            Err(e) => checks.push(Check::failed("Filter", e.to_string())),
        }

        match config.database_path() {
            Ok(path) => checks.push(database_check(&path).await),
            Err(e) => checks.push(Check::failed("Database", e.to_string())),
        }
    }

    let all_ok = checks.iter().all(|c| c.ok);

    match format {
        OutputFormat::Json => {
            let items: Vec<_> = checks
                .iter()
                .map(|c| json!({"check": c.name, "ok": c.ok, "detail": c.detail}))
                .collect();
            println!("{}", json!({"ok": all_ok, "checks": items}));
        }
        OutputFormat::Text if !quiet => {
            println!("InterKnow Health Check");
            println!("======================");
            println!();
            for check in &checks {
                let mark = if check.ok { "[OK]" } else { "[!!]" };
                println!("{} {}: {}", mark, check.name, check.detail);
            }
            println!();
            if all_ok {
                println!("All checks passed!");
            } else {
                println!("Some checks failed. See above for details.");
            }
        }
        OutputFormat::Text => {}
    }

    Ok(())
}
