use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use c4rag_core::config::{expand_path, CorpusFormat, RetrievalStrategy, Settings};
use c4rag_cli::{preprocess, run_experiment, ExperimentOptions, PreprocessOptions, Stage};
use c4rag_embed::build_embedder;

#[derive(Parser)]
#[command(name = "c4rag")]
#[command(about = "Chunk, embed and index a corpus, then score retrieval strategies against it")]
#[command(version)]
struct Cli {
    /// Extra TOML config merged over config.toml and C4RAG_* env vars
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the passage store and BM25 index from a corpus dump
    Preprocess(PreprocessArgs),
    /// Score a query set against a preprocessed store
    #[command(name = "run_experiment")]
    RunExperiment(ExperimentArgs),
}

#[derive(Args)]
struct PreprocessArgs {
    dump_path: PathBuf,
    output_dir: PathBuf,
    #[arg(long = "chunk_size", alias = "chunk-size")]
    chunk_size: Option<usize>,
    #[arg(long)]
    overlap: Option<usize>,
    /// auto, jsonl or text_dir
    #[arg(long)]
    format: Option<CorpusFormat>,
    /// Continue an interrupted run, skipping documents already stored
    #[arg(long)]
    resume: bool,
    /// Stop after this many documents
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct ExperimentArgs {
    name: String,
    queries_path: PathBuf,
    #[arg(long)]
    bootstrap: Option<usize>,
    #[arg(long = "top_k", alias = "top-k")]
    top_k: Option<usize>,
    /// Store directory written by preprocess (default: data.store_dir)
    #[arg(long)]
    store: Option<PathBuf>,
    /// dense, bm25, hybrid, tri or random
    #[arg(long)]
    strategy: Option<RetrievalStrategy>,
    /// Report directory (default: experiment.output_dir)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let path = path.map(|p| expand_path(p.to_string_lossy()));
    Ok(Settings::load_with(path.as_deref())?)
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    use anyhow::Context;

    let mut settings = load_settings(cli.config.as_ref()).context(Stage::Config)?;
    match cli.command {
        Command::Preprocess(args) => {
            if let Some(n) = args.chunk_size { settings.chunking.chunk_size = n; }
            if let Some(n) = args.overlap { settings.chunking.overlap = n; }
            if let Some(f) = args.format { settings.corpus.format = f; }
            settings.validate().context(Stage::Config)?;
            let embedder = build_embedder(&settings.embedding).context(Stage::Config)?;
            let opts = PreprocessOptions {
                dump_path: args.dump_path,
                output_dir: args.output_dir,
                resume: args.resume,
                limit: args.limit,
            };
            let summary = preprocess(&settings, embedder, &opts).await?;
            println!(
                "Preprocessed {} documents into {} passages at {} ({} skipped as already stored, {} passages failed)",
                summary.documents,
                summary.passages,
                opts.output_dir.display(),
                summary.resumed_documents,
                summary.failed_passages
            );
        }
        Command::RunExperiment(args) => {
            if let Some(n) = args.bootstrap { settings.experiment.bootstrap_count = n; }
            if let Some(n) = args.top_k { settings.retrieval.top_k = n; }
            if let Some(s) = args.strategy { settings.retrieval.strategy = s; }
            settings.validate().context(Stage::Config)?;
            let embedder = build_embedder(&settings.embedding).context(Stage::Config)?;
            let opts = ExperimentOptions {
                name: args.name,
                queries_path: args.queries_path,
                store_dir: args.store.unwrap_or_else(|| settings.store_dir()),
                output_dir: args.output.unwrap_or_else(|| settings.output_dir()),
            };
            let path = run_experiment(&settings, embedder, &opts).await?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
