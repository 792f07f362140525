//! CLI definition and command dispatch for Lumion.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (`--index-path`, `--repo-root`)
//! 2. Environment variables (`GRAPHRAG_INDEX_PATH`, `LUMION_REPO_ROOT`,
//!    `GEMINI_API_KEY`, `OLLAMA_URL`, `OLLAMA_MODEL`)
//! 3. Config file (`~/.lumion/config.yaml` or path from `--config`/`LUMION_CONFIG`)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use lumion_core::constants::{DEFAULT_GRAPH_LIMIT, DEFAULT_TOP_K};
use lumion_core::{
    CoreError, DriftSearchRequest, EngineConfig, EnrichmentJob, EnrichmentStatus,
    GlobalSearchRequest, LocalSearchRequest, RetrievalEngine, SearchFilters,
};

use crate::ui::color::terminal_width;
use crate::ui::format::{format_count, format_timestamp};
use crate::ui::{table, ColorMode, MessageType, Progress, ProgressMode, Style};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Lumion – question answering over GraphRAG index artifacts
#[derive(Parser, Debug)]
#[command(name = "lumion")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "LUMION_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress bars
    #[arg(short, long, global = true, env = "LUMION_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.lumion/config.yaml)
    #[arg(long, global = true, env = "LUMION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base path of the indexer output, relative to the repository root
    #[arg(long, global = true)]
    pub index_path: Option<PathBuf>,

    /// Repository root used to resolve relative paths
    #[arg(long, global = true)]
    pub repo_root: Option<PathBuf>,

    /// Color output mode: always, never, or auto
    #[arg(long, global = true, env = "LUMION_COLOR", default_value = "auto")]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Document-id filters shared by `local` and `drift`.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Keep only rows whose document id equals this value
    #[arg(long)]
    pub document_id: Option<String>,

    /// Keep only rows whose document id contains this substring
    #[arg(long)]
    pub contains: Option<String>,

    /// Keep only rows whose document id matches this regular expression
    #[arg(long)]
    pub regex: Option<String>,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        SearchFilters {
            document_id: args.document_id,
            document_id_contains: args.contains,
            document_id_regex: args.regex,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a question from the most relevant text units
    #[command(after_help = r#"EXAMPLES:
    # Ask a question
    lumion local "how is routing configured"

    # Structural questions are answered from the relationship graph
    lumion local "what renders QueryInterface"

    # Second page of three results, only from src/app
    lumion local "routing" --top-k 3 --offset 3 --contains src/app

    # JSON output for scripting
    lumion local "what calls graphAPI" --json | jq '.answer'
"#)]
    Local {
        /// The question to answer
        query: String,

        /// Number of results to return
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Number of ranked results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Drop returned results scoring below this value
        #[arg(long, default_value_t = 0.0)]
        min_score: f64,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the community reports
    #[command(after_help = r#"EXAMPLES:
    lumion global "what are the main subsystems"
    lumion global "authentication" --top-k 3 --json
"#)]
    Global {
        /// The question to answer
        query: String,

        /// Number of communities to return
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Compare how a topic appears across configured periods
    #[command(after_help = r#"EXAMPLES:
    # Periods map to path fragments via driftPeriods in the config
    lumion drift "routing" --period Q1 --period Q2

    # Unknown periods search the whole index
    lumion drift "state management" --period Q1 --period 2023 --json
"#)]
    Drift {
        /// The topic to track
        query: String,

        /// Period label (repeatable)
        #[arg(long = "period", required = true)]
        periods: Vec<String>,

        /// Results considered per period
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Drop results scoring below this value
        #[arg(long, default_value_t = 0.0)]
        min_score: f64,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one entity from the knowledge graph
    #[command(after_help = r#"EXAMPLES:
    lumion entity cmp_QueryInterface
    lumion entity fn_handleSubmit --json
"#)]
    Entity {
        /// Entity id
        id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show which artifacts and providers the engine is using
    #[command(after_help = r#"EXAMPLES:
    lumion status
    lumion status --json | jq '.tables[] | select(.available | not)'
"#)]
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Embed every text unit and store the vectors with the artifacts
    #[command(after_help = r#"EXAMPLES:
    # Requires GEMINI_API_KEY or OLLAMA_URL
    OLLAMA_URL=http://localhost:11434 lumion enrich-embeddings
"#)]
    EnrichEmbeddings {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Extract entities and relationships from text units with the LLM
    #[command(after_help = r#"EXAMPLES:
    # Requires GEMINI_API_KEY
    lumion enrich-graph --limit 20
"#)]
    EnrichGraph {
        /// Maximum number of text units to send to the model
        #[arg(long, default_value_t = DEFAULT_GRAPH_LIMIT)]
        limit: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always; debug with --verbose. Logs go to stderr so --json stays parseable.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "lumion_core={0},lumion_db={0},lumion_model={0},lumion_cli={0}",
        log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let hint = match &e {
                CoreError::InvalidConfiguration { hint, .. } => hint.clone(),
                _ => match &cli.config {
                    Some(path) => format!("Check your config at {}", path.display()),
                    None => "Check your global config at ~/.lumion/config.yaml".to_string(),
                },
            };
            eprintln!(
                "{}",
                style.error_with_context("Failed to load configuration", Some(&e.to_string()), Some(&hint))
            );
            return ExitCode::FAILURE;
        }
    };

    let engine = RetrievalEngine::new(config);
    let quiet = cli.quiet;

    let result = match cli.command {
        Command::Local {
            query,
            top_k,
            offset,
            min_score,
            filters,
            json,
        } => {
            let request = LocalSearchRequest::new(query)
                .with_top_k(top_k)
                .with_offset(offset)
                .with_min_score(min_score)
                .with_filters(filters.into());
            handle_local(&style, &engine, &request, json)
        }
        Command::Global { query, top_k, json } => {
            let request = GlobalSearchRequest::new(query).with_top_k(top_k);
            handle_global(&style, &engine, &request, json)
        }
        Command::Drift {
            query,
            periods,
            top_k,
            min_score,
            filters,
            json,
        } => {
            let request = DriftSearchRequest::new(query, periods)
                .with_top_k(top_k)
                .with_min_score(min_score)
                .with_filters(filters.into());
            handle_drift(&style, &engine, &request, json)
        }
        Command::Entity { id, json } => handle_entity(&style, &engine, &id, json),
        Command::Status { json } => handle_status(&style, &engine, json),
        Command::EnrichEmbeddings { json } => handle_enrich(&style, &engine, None, quiet, json),
        Command::EnrichGraph { limit, json } => handle_enrich(&style, &engine, Some(limit), quiet, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Config file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<EngineConfig, CoreError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::load_default()?,
    };

    let mut config = config.with_env_overrides();
    if let Some(index_path) = &cli.index_path {
        config.index_path = index_path.clone();
    }
    if let Some(repo_root) = &cli.repo_root {
        config.repo_root = repo_root.clone();
    }

    // Flags can still produce an invalid config; file warnings were already logged.
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command handlers
// ============================================================================

fn print_answer(style: &Style, answer: &str) {
    println!("{}", style.section("ANSWER"));
    println!();
    for line in answer.lines() {
        println!("  {}", line);
    }
    println!();
}

fn handle_local(style: &Style, engine: &RetrievalEngine, request: &LocalSearchRequest, json: bool) -> Result<()> {
    let result = engine.local_search(request);
    if json {
        return print_json(&result);
    }

    print_answer(style, &result.answer);

    if let Some(pattern) = result.pattern {
        println!("{}", style.key_value("Resolved from graph", pattern.as_str()));
    }

    if !result.sources.is_empty() {
        println!();
        println!("{}", style.section(&format!("SOURCES ({})", result.sources.len())));
        println!("{}", table::render_citations_table(&result.sources, terminal_width()));
    }

    if !result.entities.is_empty() {
        println!();
        println!("{}", style.section("ENTITIES"));
        for entity in &result.entities {
            println!("{}", style.list_item(&format!("{} [{}] {}", entity.name, entity.kind, entity.id)));
        }
    }

    println!();
    println!("{}", style.key_value("Confidence", &style.confidence(result.confidence)));
    Ok(())
}

fn handle_global(style: &Style, engine: &RetrievalEngine, request: &GlobalSearchRequest, json: bool) -> Result<()> {
    let result = engine.global_search(request);
    if json {
        return print_json(&result);
    }

    print_answer(style, &result.answer);

    if !result.communities.is_empty() {
        println!("{}", style.section(&format!("COMMUNITIES ({})", result.communities.len())));
        println!("{}", table::render_communities_table(&result.communities, terminal_width()));
        if let Some(column) = &result.ranked_by {
            println!("{}", style.message(MessageType::Info, &format!("No lexical match; ranked by {}", column)));
        }
        println!();
    }

    if !result.key_themes.is_empty() {
        println!("{}", style.section("KEY THEMES"));
        for theme in &result.key_themes {
            println!("{}", style.list_item(theme));
        }
        println!();
    }

    println!("{}", style.key_value("Confidence", &style.confidence(result.confidence)));
    Ok(())
}

fn handle_drift(style: &Style, engine: &RetrievalEngine, request: &DriftSearchRequest, json: bool) -> Result<()> {
    let result = engine.drift_search(request);
    if json {
        return print_json(&result);
    }

    println!("{}", style.section(&format!("TIMELINE: {}", request.query)));
    println!();
    println!("{}", table::render_timeline_table(&result.timeline, terminal_width()));

    for (title, items) in [("TRENDS", &result.trends), ("INSIGHTS", &result.insights)] {
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{}", style.section(title));
        for item in items {
            println!("{}", style.list_item(item));
        }
    }
    Ok(())
}

fn handle_entity(style: &Style, engine: &RetrievalEngine, id: &str, json: bool) -> Result<()> {
    let entity = engine
        .entity_context(id)
        .ok_or_else(|| anyhow!("Entity '{}' not found in the entities table", id))?;
    if json {
        return print_json(&entity);
    }

    println!("{}", style.section(&entity.name));
    println!();
    println!("  {}", style.key_value("Id", &entity.id));
    println!("  {}", style.key_value("Type", &entity.kind));
    if let Some(document_id) = &entity.document_id {
        println!("  {}", style.key_value("Document", &style.file_path(document_id)));
    }
    if let Some(description) = &entity.description {
        println!();
        println!("  {}", description);
    }
    Ok(())
}

fn handle_status(style: &Style, engine: &RetrievalEngine, json: bool) -> Result<()> {
    let status = engine.index_status();
    if json {
        return print_json(&status);
    }

    println!("{}", style.section("STATUS"));
    println!();
    println!("  {}", style.key_value("Index path", &status.index_path.display().to_string()));
    match &status.artifact_dir {
        Some(dir) => println!("  {}", style.key_value("Artifacts", &style.file_path(&dir.display().to_string()))),
        None => println!("  {}", style.key_value("Artifacts", "(none found)")),
    }
    println!(
        "  {}",
        style.key_value("Text column", status.text_column.as_deref().unwrap_or("(none)"))
    );
    let providers = if status.embedding_providers.is_empty() {
        "(none)".to_string()
    } else {
        status.embedding_providers.join(", ")
    };
    println!("  {}", style.key_value("Embeddings", &providers));
    println!(
        "  {}",
        style.key_value("Completion model", status.completion_model.as_deref().unwrap_or("(none)"))
    );
    println!();
    println!("{}", table::render_table_status(&status.tables, terminal_width()));

    if status.artifact_dir.is_none() {
        println!();
        println!(
            "{}",
            style.message(
                MessageType::Hint,
                "Run the indexer first, or point --index-path / GRAPHRAG_INDEX_PATH at its output"
            )
        );
    }
    Ok(())
}

/// Run an enrichment job; `graph_limit` selects graph extraction.
fn handle_enrich(
    style: &Style,
    engine: &RetrievalEngine,
    graph_limit: Option<usize>,
    quiet: bool,
    json: bool,
) -> Result<()> {
    let mode = ProgressMode::detect(quiet, json);
    let status = match graph_limit {
        Some(limit) => {
            let progress = Progress::bar("Extracting graph", mode);
            let status = engine.enrich_graph_with(limit, &mut |done, total| progress.update(done, total));
            progress.finish_clear();
            status
        }
        None => {
            let progress = Progress::bar("Embedding text units", mode);
            let status = engine.enrich_embeddings_with(&mut |done, total| progress.update(done, total));
            progress.finish_clear();
            status
        }
    };

    if json {
        return print_json(&status);
    }
    report_enrichment(style, &status);
    Ok(())
}

fn report_enrichment(style: &Style, status: &EnrichmentStatus) {
    let label = match status.job {
        EnrichmentJob::Embeddings => "Embedding enrichment",
        EnrichmentJob::Graph => "Graph enrichment",
    };
    let ran = status.updated.is_some() || status.entities.is_some();

    if !ran {
        let reason = status.reason.as_deref().unwrap_or("nothing to do");
        println!("{}", style.message(MessageType::Skip, &format!("{} skipped: {}", label, reason)));
        return;
    }

    if status.saved {
        println!("{}", style.message(MessageType::Ok, &format!("{} finished", label)));
    } else {
        let reason = status.reason.as_deref().unwrap_or("unknown error");
        println!(
            "{}",
            style.message(MessageType::Warn, &format!("{} finished but was not saved: {}", label, reason))
        );
    }

    match status.job {
        EnrichmentJob::Embeddings => {
            println!("{}", style.message_detail("Embedded", &format_count(status.updated)));
        }
        EnrichmentJob::Graph => {
            println!("{}", style.message_detail("Entities", &format_count(status.entities)));
            println!("{}", style.message_detail("Relationships", &format_count(status.relationships)));
        }
    }
    println!("{}", style.message_detail("Failed", &status.failed.to_string()));
    println!("{}", style.message_detail("Finished", &format_timestamp(&status.finished_at)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_local_with_filters() {
        let cli = Cli::parse_from([
            "lumion", "local", "what renders Page", "--top-k", "3", "--offset", "3", "--contains", "src/app",
        ]);
        match cli.command {
            Command::Local {
                query,
                top_k,
                offset,
                filters,
                json,
                ..
            } => {
                assert_eq!(query, "what renders Page");
                assert_eq!(top_k, 3);
                assert_eq!(offset, 3);
                assert_eq!(filters.contains.as_deref(), Some("src/app"));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_drift_requires_a_period() {
        assert!(Cli::try_parse_from(["lumion", "drift", "routing"]).is_err());

        let cli = Cli::parse_from(["lumion", "drift", "routing", "--period", "Q1", "--period", "Q2"]);
        match cli.command {
            Command::Drift { periods, .. } => assert_eq!(periods, vec!["Q1", "Q2"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_color_flag_parses() {
        let cli = Cli::parse_from(["lumion", "--color", "never", "status"]);
        assert_eq!(cli.color, ColorMode::Never);
        assert!(Cli::try_parse_from(["lumion", "--color", "rainbow", "status"]).is_err());
    }

    #[test]
    fn test_filter_args_into_search_filters() {
        let filters: SearchFilters = FilterArgs {
            document_id: Some("a.md".to_string()),
            contains: None,
            regex: Some("^src/".to_string()),
        }
        .into();
        assert_eq!(filters.document_id.as_deref(), Some("a.md"));
        assert_eq!(filters.document_id_regex.as_deref(), Some("^src/"));
        assert!(filters.document_id_contains.is_none());
    }
}
