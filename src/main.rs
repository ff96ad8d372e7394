//! askbuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use askbuddy::{
    cli::{Args, Commands, Config, Verbosity},
    corpus::{ingest_directory, Embedder, QdrantCorpus},
    doctor::Doctor,
    llm::OllamaClient,
    types::AttemptOutcome,
    AnswerResult, PipelineBuilder,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(message) = args.validate() {
        eprintln!("{}", message.red());
        std::process::exit(2);
    }

    init_logging(args.verbosity());

    let config = load_config(&args)?;

    match &args.command {
        Some(Commands::Ingest { dir }) => run_ingest(&args, &config, dir).await?,
        Some(Commands::Doctor) => run_doctor(config).await,
        Some(Commands::Config) => show_config(&config)?,
        None => {
            if let Some(question) = &args.question {
                run_question(&args, &config, question).await?;
            }
        }
    }

    Ok(())
}

/// RUST_LOG wins over the verbosity flags
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone()).context("failed to load configuration")?;

    if let Some(model) = &args.model {
        config.ollama.model = model.clone();
    }
    if let Some(host) = &args.host {
        config.ollama.host = host.clone();
    }
    if let Some(port) = args.port {
        config.ollama.port = port;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn run_question(args: &Args, config: &Config, question: &str) -> Result<()> {
    let verbosity = args.verbosity();

    let pipeline = PipelineBuilder::from_config(config)
        .context("failed to set up the question pipeline")?
        .build()
        .context("failed to build the question pipeline")?;

    let pb = (verbosity.show_progress() && !args.json).then(|| spinner("Thinking..."));
    let result = pipeline.ask(question).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialize answer")?
        );
    } else {
        print_answer(&result, verbosity);
    }

    Ok(())
}

fn print_answer(result: &AnswerResult, verbosity: Verbosity) {
    if verbosity == Verbosity::Quiet {
        println!("{}", result.answer);
        return;
    }

    println!("\n{}\n", result.answer);

    let label = result.label.to_string();
    let label = if result.label.is_answer() {
        label.green()
    } else {
        label.yellow()
    };
    println!("{} {}  {} {}", "Source:".dimmed(), label, "Track:".dimmed(), result.track);

    if verbosity.show_attempts() && !result.attempts.is_empty() {
        println!("\n{}", "Sources tried:".bold());
        for (i, attempt) in result.attempts.iter().enumerate() {
            let outcome = match &attempt.outcome {
                AttemptOutcome::Accepted => "accepted".green().to_string(),
                AttemptOutcome::Rejected { reason } => format!("rejected: {}", reason).yellow().to_string(),
                AttemptOutcome::Errored { message } => format!("error: {}", message).red().to_string(),
            };
            println!("  {}. {:<12} {}", i + 1, attempt.source, outcome);
        }
    }
    println!();
}

async fn run_ingest(args: &Args, config: &Config, dir: &std::path::Path) -> Result<()> {
    let ollama = OllamaClient::with_timeout(
        &config.ollama_url(),
        &config.ollama.model,
        Duration::from_secs(config.ollama.request_timeout_secs),
    )?
    .with_embedding_model(config.ollama.embedding_model.clone());
    let embedder: Arc<dyn Embedder> = Arc::new(ollama);

    let corpus = QdrantCorpus::connect(&config.corpus.qdrant_url, &config.corpus.collection, embedder)
        .context("failed to connect to Qdrant")?;

    let pb = args
        .verbosity()
        .show_progress()
        .then(|| spinner(&format!("Ingesting {}...", dir.display())));

    let report = ingest_directory(dir, config.corpus.chunk_size, config.corpus.chunk_overlap, &corpus)
        .await
        .with_context(|| format!("failed to ingest {}", dir.display()));

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let report = report?;

    println!(
        "{} {} files, {} chunks into '{}' ({} skipped)",
        "Ingested".green(),
        report.files,
        report.chunks,
        corpus.collection(),
        report.skipped
    );

    Ok(())
}

async fn run_doctor(config: Config) {
    let doctor = Doctor::new(config);
    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(config: &Config) -> Result<()> {
    if let Some(path) = Config::default_path() {
        println!("{} {}\n", "Default config file:".dimmed(), path.display());
    }
    println!("{}", config.to_toml()?);
    Ok(())
}
