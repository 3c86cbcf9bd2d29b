use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use transcheck_core::{annotate, AnalysisResult, Analyzer, CancelToken};
use transcheck_local::pipeline::{Pipeline, PipelineCfg};
use transcheck_local::{GeminiAnalyzer, HttpFetcher, OpenAiCompatAnalyzer};

mod store;
use store::{FileStore, StoredAnalysis};

#[derive(Parser, Debug)]
#[command(name = "transcheck")]
#[command(about = "Check a PTT translation post against its source article", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a PTT post, resolve its source, analyze it, and store the result (json).
    Analyze(AnalyzeCmd),
    /// Re-render highlight segments for a stored analysis (json; no network).
    Annotate(AnnotateCmd),
    /// List stored analysis ids in insertion order.
    List(ListCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    Gemini,
    OpenaiCompat,
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    /// PTT article URL (https://www.ptt.cc/bbs/<board>/<id>.html).
    url: String,
    /// Which analyzer backend to use.
    #[arg(long, value_enum, default_value = "gemini")]
    provider: Provider,
    /// Directory for stored analyses (one json file per run).
    #[arg(long, default_value = ".transcheck")]
    out: PathBuf,
    /// Per-request fetch timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    fetch_timeout_ms: u64,
    /// Analyzer request timeout in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    analyze_timeout_ms: u64,
    /// Pretty-print the output json.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args, Debug)]
struct AnnotateCmd {
    /// Stored analysis json (or a bare analysis result).
    #[arg(long)]
    input: PathBuf,
    /// Pretty-print the output json.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args, Debug)]
struct ListCmd {
    /// Directory for stored analyses.
    #[arg(long, default_value = ".transcheck")]
    out: PathBuf,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {}

/// Everything a caller needs to render one analysis: the raw result plus
/// the highlight segments derived from it.
#[derive(Debug, serde::Serialize)]
struct AnalyzeOutput<'a> {
    id: &'a str,
    url: &'a str,
    result: &'a AnalysisResult,
    annotated: Vec<annotate::AnnotatedParagraph>,
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

async fn run_analyze(cmd: AnalyzeCmd) -> Result<()> {
    let fetcher = HttpFetcher::new().map_err(|e| anyhow::anyhow!("{e} ({})", e.kind()))?;
    let client = reqwest::Client::new();
    let analyzer: Arc<dyn Analyzer> = match cmd.provider {
        Provider::Gemini => Arc::new(
            GeminiAnalyzer::from_env(client, cmd.analyze_timeout_ms)
                .map_err(|e| anyhow::anyhow!("{e} ({})", e.kind()))?,
        ),
        Provider::OpenaiCompat => Arc::new(
            OpenAiCompatAnalyzer::from_env(client, cmd.analyze_timeout_ms)
                .map_err(|e| anyhow::anyhow!("{e} ({})", e.kind()))?,
        ),
    };

    let cfg = PipelineCfg {
        fetch_timeout_ms: cmd.fetch_timeout_ms,
        source_timeout_ms: cmd.fetch_timeout_ms,
        ..PipelineCfg::default()
    };
    let pipeline = Pipeline::new(Arc::new(fetcher), analyzer, cfg);

    let cancel = CancelToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel_signal.cancel();
        }
    });

    let result = pipeline
        .submit(&cmd.url, &cancel)
        .await
        .map_err(|e| anyhow::anyhow!("{e} ({})", e.kind()))?;

    let store = FileStore::new(&cmd.out);
    let id = store.next_id(&cmd.url)?;
    let entry = StoredAnalysis {
        id,
        url: cmd.url.clone(),
        result,
    };
    let path = store.append(&entry)?;
    tracing::info!(id = %entry.id, path = %path.display(), "analysis stored");

    let annotated = annotate::annotate(&entry.result.post_text, &entry.result.discrepancies);
    print_json(
        &AnalyzeOutput {
            id: &entry.id,
            url: &entry.url,
            result: &entry.result,
            annotated,
        },
        cmd.pretty,
    )
}

fn run_annotate(cmd: AnnotateCmd) -> Result<()> {
    let entry = FileStore::load(&cmd.input)?;
    let annotated = annotate::annotate(&entry.result.post_text, &entry.result.discrepancies);
    print_json(
        &AnalyzeOutput {
            id: &entry.id,
            url: &entry.url,
            result: &entry.result,
            annotated,
        },
        cmd.pretty,
    )
}

fn run_list(cmd: ListCmd) -> Result<()> {
    let store = FileStore::new(&cmd.out);
    for id in store.ids().context("listing stored analyses")? {
        println!("{id}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(cmd) => run_analyze(cmd).await,
        Commands::Annotate(cmd) => run_annotate(cmd),
        Commands::List(cmd) => run_list(cmd),
        Commands::Version(_) => {
            println!("transcheck {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
