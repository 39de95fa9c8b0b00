mod console;
mod sources;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use corpus_engine::{CancellationToken, OutputLayout, Pipeline, PipelineConfig, RunSummary};
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;

use console::ConsoleSink;
use sources::load_sources;

/// Download a technical documentation corpus as HTML, Markdown and PDF.
#[derive(Parser, Debug)]
#[command(name = "corpus_fetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Render PDFs for HTML pages via headless Chrome
    #[arg(long)]
    pdf: bool,

    /// RON pipeline configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root for html/, md/, pdf/ and metadata.jsonl
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// URL to fetch instead of the built-in list (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// File with one URL per line
    #[arg(long, value_name = "FILE")]
    urls_file: Option<PathBuf>,

    /// Items processed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(summary) if summary.all_succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.verbose, cli.log_file.is_some()) {
        (true, _) => LevelFilter::Debug,
        (false, true) => LevelFilter::Info,
        (false, false) => LevelFilter::Warn,
    };
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = &cli.out {
        config.output = OutputLayout::under(root);
    }
    if cli.pdf {
        config.render_pdf = true;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency.max(1);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = build_config(&cli)?;
    let items = load_sources(&cli.urls, cli.urls_file.as_deref())?;
    engine_info!("Fetching {} sources", items.len());

    let console = ConsoleSink::new(config.render_pdf);
    let pipeline = Pipeline::builder(config)
        .progress(Arc::new(console))
        .build()
        .context("failed to set up pipeline")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; finishing items in flight");
            on_interrupt.cancel();
        }
    });

    let summary = pipeline
        .run_until_cancelled(&items, cancel)
        .await
        .context("pipeline run failed")?;

    let layout = &pipeline.config().output;
    println!("\nDone. {summary}");
    println!(
        "Saved to: {}, {}, {}",
        display_path(&layout.html_dir),
        display_path(&layout.md_dir),
        display_path(&layout.pdf_dir)
    );
    println!("Metadata: {}", display_path(&layout.metadata_path));
    Ok(summary)
}

fn display_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
