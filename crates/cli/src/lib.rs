use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use votematch_engine::{EngineConfig, EngineError, MatchService, Matcher};
use votematch_protocol::{
    schema_json, serialize_json, AnswerSheet, ClusterSummary, ErrorEnvelope, RankReport,
    ANSWER_SHEET_SCHEMA_VERSION,
};
use votematch_vector_store::{BillCatalog, ClusterCatalog, VectorStoreError};

mod quiz;
mod ranking;
mod report;

pub use ranking::build_rank_report;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "votematch")]
#[command(about = "Find the legislators who vote the way you would", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the clusters in a cluster-vector file
    Inspect(InspectArgs),

    /// Answer questions interactively and see who matches you
    Quiz(QuizArgs),

    /// Rank legislators from a recorded answer sheet
    Rank(RankArgs),

    /// Print the JSON schema of an input or output document
    Schema(SchemaArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// Cluster-vector file
    vectors: PathBuf,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QuizArgs {
    /// Cluster-vector file
    vectors: PathBuf,

    /// Bill metadata (JSON array) used for question titles
    #[arg(long)]
    bills: Option<PathBuf>,

    /// Restrict the quiz to these cluster labels (repeatable)
    #[arg(long = "cluster")]
    clusters: Vec<String>,

    /// Number of legislators in the final ranking (0 = all)
    #[arg(long, short = 'n', default_value_t = 10)]
    top: usize,
}

#[derive(Args)]
struct RankArgs {
    /// Cluster-vector file
    vectors: PathBuf,

    /// Answer sheet to replay
    #[arg(long)]
    answers: PathBuf,

    /// Bill metadata (JSON array) used for titles in text output
    #[arg(long)]
    bills: Option<PathBuf>,

    /// Number of legislators per ranking (0 = all)
    #[arg(long, short = 'n', default_value_t = 10)]
    top: usize,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SchemaArgs {
    /// Document to describe
    #[arg(value_enum)]
    kind: SchemaKind,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    AnswerSheet,
    RankReport,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Inspect(args) => args.json,
        Commands::Rank(args) => args.json,
        Commands::Schema(_) => true,
        Commands::Quiz(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Inspect(args) => run_inspect(args).await?,
        Commands::Quiz(args) => run_quiz(args, cli.config.as_deref()).await?,
        Commands::Rank(args) => run_rank(args, cli.config.as_deref()).await?,
        Commands::Schema(args) => run_schema(&args)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

async fn load_clusters(path: &Path) -> Result<ClusterCatalog> {
    ClusterCatalog::load(path)
        .await
        .with_context(|| format!("Failed to load cluster vectors from {}", path.display()))
}

async fn load_bills(path: Option<&Path>, clusters: &ClusterCatalog) -> Result<BillCatalog> {
    let mut bills = match path {
        Some(path) => BillCatalog::load(path)
            .await
            .with_context(|| format!("Failed to load bills from {}", path.display()))?,
        None => BillCatalog::new(),
    };
    for cluster in clusters.clusters().values() {
        bills.fill_from_representatives(cluster.all_representative_bills());
    }
    Ok(bills)
}

async fn load_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read answer sheet {}", path.display()))?;
    let sheet: AnswerSheet = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid answer sheet {}", path.display()))?;
    if let Some(version) = sheet.schema_version {
        if version > ANSWER_SHEET_SCHEMA_VERSION {
            bail!(
                "Answer sheet schema_version {version} is newer than supported ({ANSWER_SHEET_SCHEMA_VERSION})"
            );
        }
    }
    Ok(sheet)
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let catalog = load_clusters(&args.vectors).await?;
    let summaries: Vec<ClusterSummary> = catalog
        .clusters()
        .values()
        .map(|cluster| cluster.summary())
        .collect();

    if args.json {
        print_stdout(&serialize_json(&summaries)?)?;
    } else {
        print_stdout(report::render_inspect(catalog.clustering_id(), &summaries).trim_end())?;
    }
    Ok(())
}

async fn run_quiz(args: QuizArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let clusters = load_clusters(&args.vectors).await?;
    let bills = load_bills(args.bills.as_deref(), &clusters).await?;
    let service = MatchService::in_memory(config, Arc::new(clusters), Arc::new(bills))?;

    let labels = (!args.clusters.is_empty()).then_some(args.clusters);
    quiz::run(&service, labels, args.top).await
}

async fn run_rank(args: RankArgs, config_path: Option<&Path>) -> Result<()> {
    match rank_from_files(&args, config_path).await {
        Ok((report, rendered)) => {
            if args.json {
                print_stdout(&serialize_json(&report)?)?;
            } else {
                print_stdout(rendered.trim_end())?;
            }
            Ok(())
        }
        Err(err) if args.json => {
            print_stdout(&serialize_json(&error_envelope(&err))?)?;
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

async fn rank_from_files(
    args: &RankArgs,
    config_path: Option<&Path>,
) -> Result<(RankReport, String)> {
    let matcher = Matcher::new(load_config(config_path)?)?;
    let clusters = load_clusters(&args.vectors).await?;
    let sheet = load_answer_sheet(&args.answers).await?;
    let report = build_rank_report(&matcher, &clusters, &sheet, args.top)?;

    let rendered = if args.json {
        String::new()
    } else {
        let bills = load_bills(args.bills.as_deref(), &clusters).await?;
        report::render_rank_report(&report, &clusters, &bills)
    };
    Ok((report, rendered))
}

fn run_schema(args: &SchemaArgs) -> Result<()> {
    let schema = match args.kind {
        SchemaKind::AnswerSheet => schema_json::<AnswerSheet>()?,
        SchemaKind::RankReport => schema_json::<RankReport>()?,
    };
    print_stdout(&schema)
}

fn error_envelope(err: &anyhow::Error) -> ErrorEnvelope {
    let engine = err.chain().find_map(|e| e.downcast_ref::<EngineError>());
    let store = err.chain().find_map(|e| e.downcast_ref::<VectorStoreError>());

    let code = match (engine, store) {
        (Some(err), _) => err.code(),
        (None, Some(err)) => err.code(),
        (None, None) if err.chain().any(|e| e.is::<serde_json::Error>()) => "invalid_json",
        (None, None) if err.chain().any(|e| e.is::<io::Error>()) => "io_error",
        (None, None) => "internal",
    };

    ErrorEnvelope {
        code: code.to_string(),
        message: format!("{err:#}"),
        hint: hint_for(code),
    }
}

fn hint_for(code: &str) -> Option<String> {
    let hint = match code {
        "unknown_cluster" => "Run `votematch inspect <vectors>` to list cluster labels",
        "duplicate_cluster" => "List each cluster label once",
        "unknown_bill" => "Answers must reference bills listed in the cluster's billIds",
        "invalid_score" => "Scores must be finite numbers; 1 = agree, 0 = neutral, -1 = disagree",
        "invalid_importance" => "Importance must be an integer from 1 to 5",
        "invalid_config" => "Check the TOML keys against `EngineConfig`",
        "invalid_json" => "Run `votematch schema answer-sheet` for the expected format",
        _ => return None,
    };
    Some(hint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn envelope_uses_engine_codes_through_context() {
        let err = anyhow::Error::new(EngineError::InvalidImportance(7)).context("replaying sheet");
        let envelope = error_envelope(&err);
        assert_eq!(envelope.code, "invalid_importance");
        assert!(envelope.message.contains("replaying sheet"));
        assert!(envelope.hint.is_some());
    }

    #[test]
    fn envelope_falls_back_to_internal() {
        let envelope = error_envelope(&anyhow::anyhow!("boom"));
        assert_eq!(envelope.code, "internal");
        assert_eq!(envelope.hint, None);
    }
}
