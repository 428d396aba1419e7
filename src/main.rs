use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use refscreen::classifier::GeminiClient;
use refscreen::config::{Config, Tuning};
use refscreen::dedup::DedupRun;
use refscreen::domain::{DedupSummary, Protocol, RunSummary};
use refscreen::platform::{DryRunPlatform, PlatformClient, RayyanClient, Session};
use refscreen::screening::{ScreeningRun, StopFlag};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refscreen")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("refscreen.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn load_protocol(tuning: &Tuning) -> Result<Protocol> {
    match &tuning.protocol_path {
        Some(path) => Protocol::from_file(path)
            .with_context(|| format!("Failed to load protocol from {}", path.display())),
        None => Ok(Protocol::default()),
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "Screening run complete".bold());
    println!("  processed: {}", summary.processed);
    println!("  {} {}", "included:".green(), summary.included);
    println!("  {} {}", "excluded:".red(), summary.excluded);
    println!("  {} {}", "maybe:".yellow(), summary.maybe);
    println!("  failed:    {}", summary.failed);

    if summary.stopped_early {
        println!("{}", "Run stopped before the snapshot was finished".yellow());
    }

    if !summary.failures.is_empty() {
        println!();
        println!("{}", "Still undecided after retries:".yellow());
        for failure in &summary.failures {
            println!(
                "  {} {} ({})",
                format!("#{}", failure.article_id).cyan(),
                failure.title,
                failure.error
            );
        }
    }
}

fn print_dedup_summary(summary: &DedupSummary) {
    println!();
    println!("{}", "Duplicate resolution complete".bold());
    println!("  clusters:  {}", summary.clusters);
    println!("  compared:  {}", summary.compared);
    println!("  {} {}", "duplicate:".red(), summary.duplicates);
    println!("  {} {}", "distinct: ".green(), summary.distinct);
    println!("  failed:    {}", summary.failed);

    if summary.stopped_early {
        println!("{}", "Run stopped before every cluster was resolved".yellow());
    }

    if !summary.failures.is_empty() {
        println!();
        println!("{}", "Still unresolved after retries:".yellow());
        for failure in &summary.failures {
            println!(
                "  {} {} ({})",
                format!("#{}", failure.article_id).cyan(),
                failure.title,
                failure.error
            );
        }
    }
}

fn spawn_ctrl_c_handler() -> StopFlag {
    let stop = StopFlag::new();
    let ctrl_c_flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{}",
                "Stop requested, finishing the current article...".yellow()
            );
            ctrl_c_flag.raise();
        }
    });
    stop
}

async fn run_screening(
    cli: &Cli,
    config: &Config,
    review_override: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let review_id = review_override.unwrap_or(&config.review_id).to_string();

    if cli.is_verbose() {
        println!("{} review {}", "Screening".cyan(), review_id);
    }

    let session = Session::load(config.tuning.headers_path.as_deref())
        .context("Failed to load platform session")?;

    let rayyan = Arc::new(
        RayyanClient::new(
            session,
            review_id.clone(),
            config.request_timeout(),
            config.tuning.batch_size,
        )
        .context("Failed to build platform client")?,
    );

    let platform: Arc<dyn PlatformClient> = if dry_run {
        println!("{}", "Dry run: decisions will not be written back".yellow());
        Arc::new(DryRunPlatform::new(rayyan))
    } else {
        rayyan
    };

    let classifier = Arc::new(
        GeminiClient::new(
            config.classifier_api_key.clone(),
            config.tuning.model.clone(),
            config.request_timeout(),
        )
        .context("Failed to build classifier client")?,
    );

    let protocol = load_protocol(&config.tuning)?;

    let stop = spawn_ctrl_c_handler();

    let run = ScreeningRun::new(platform, classifier, protocol, review_id)
        .with_policy(config.retry_policy())
        .with_pacing(config.pacing())
        .with_stop_flag(stop);

    let summary = run.run().await.context("Screening run failed")?;
    print_summary(&summary);

    Ok(())
}

async fn run_dedup(cli: &Cli, config: &Config, review_override: Option<&str>) -> Result<()> {
    let review_id = review_override.unwrap_or(&config.review_id).to_string();

    if cli.is_verbose() {
        println!("{} review {}", "Resolving duplicates in".cyan(), review_id);
    }

    let session = Session::load(config.tuning.headers_path.as_deref())
        .context("Failed to load platform session")?;

    let store = Arc::new(
        RayyanClient::new(
            session,
            review_id.clone(),
            config.request_timeout(),
            config.tuning.batch_size,
        )
        .context("Failed to build platform client")?,
    );

    let judge = Arc::new(
        GeminiClient::new(
            config.classifier_api_key.clone(),
            config.tuning.dedup_model.clone(),
            config.request_timeout(),
        )
        .context("Failed to build classifier client")?,
    );

    let stop = spawn_ctrl_c_handler();

    let run = DedupRun::new(store, judge, review_id)
        .with_policy(config.retry_policy())
        .with_pacing(config.pacing())
        .with_stop_flag(stop);

    let summary = run.run().await.context("Duplicate resolution failed")?;
    print_dedup_summary(&summary);

    Ok(())
}

async fn run_application(cli: &Cli) -> Result<()> {
    info!("Starting application");

    // Showing the criteria needs no credentials, so skip the full config
    if let Some(Commands::Protocol) = &cli.command {
        let tuning = Tuning::load(cli.config.as_ref()).context("Failed to load configuration")?;
        let protocol = load_protocol(&tuning)?;
        println!("{}", protocol.text());
        return Ok(());
    }

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match &cli.command {
        Some(Commands::Run { review_id, dry_run }) => {
            run_screening(cli, &config, review_id.as_deref(), *dry_run).await
        }
        Some(Commands::Duplicates { review_id }) => {
            run_dedup(cli, &config, review_id.as_deref()).await
        }
        _ => run_screening(cli, &config, None, false).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file is optional; real environment wins
    dotenvy::dotenv().ok();

    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli).await.context("Application failed")?;

    Ok(())
}
