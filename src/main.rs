use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::Path;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shorts_pipeline::cli::{Cli, Commands};
use shorts_pipeline::config::{RunConfig, Settings};
use shorts_pipeline::pipeline::{run_span, FetchSummary, IngestSummary, Pipeline};
use shorts_pipeline::publish::PublishReport;
use shorts_pipeline::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let settings = Settings::load()?;

    if let Commands::Config { show, init } = cli.command {
        return run_config_command(&settings, show, init);
    }

    let Some(profile) = cli.command.storage_profile() else {
        return Ok(());
    };

    // Configuration errors end the run before any tool is started
    let config = RunConfig::from_env(profile, cli.command.needs_database(), cli.video_id.clone())
        .context("Invalid configuration")?;

    tracing::info!("Video: {}", config.video_id);
    tracing::info!(
        "Storage: bucket {} at {} (access key {})",
        config.storage.bucket,
        config.storage.endpoint,
        utils::mask_secret(&config.storage.access_key)
    );
    if let Some(database) = &config.database {
        tracing::info!("Database host: {}", database.host());
    }

    if cli.command.needs_tools() {
        let tools = &settings.tools;
        let missing = utils::check_dependencies(&[
            tools.yt_dlp.as_str(),
            tools.ffmpeg.as_str(),
            tools.ffprobe.as_str(),
        ])
        .await;
        if !missing.is_empty() {
            tracing::warn!("Dependency check warnings:");
            for dep in &missing {
                tracing::warn!("  - {}", dep);
            }
            tracing::warn!("Continuing anyway, the tools may still be available");
        }
    }

    let pipeline = Pipeline::new(settings, !cli.quiet);
    let span = run_span(cli.command.name(), &config.video_id);

    async {
        match cli.command {
            Commands::Ingest => print_ingest_summary(&pipeline.ingest(&config).await?),
            Commands::Fetch => print_fetch_summary(&pipeline.fetch(&config).await?),
            Commands::Process => print_publish_report(&pipeline.process(&config).await?),
            Commands::Publish => print_publish_report(&pipeline.publish(&config).await?),
            Commands::Config { .. } => {}
        }
        Ok::<_, anyhow::Error>(())
    }
    .instrument(span)
    .await
}

fn init_tracing(verbose: bool, json_logs: bool) {
    let default_filter = if verbose {
        "shorts_pipeline=debug,shorts=debug"
    } else {
        "shorts_pipeline=info,shorts=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (json_layer, text_layer) = if json_logs {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn run_config_command(settings: &Settings, show: bool, init: bool) -> Result<()> {
    if init {
        let path = Path::new("shorts.yaml");
        if path.exists() {
            anyhow::bail!("{} already exists", path.display());
        }
        Settings::default().save_to(path)?;
        println!("{} Settings written to {}", style("✓").green(), path.display());
        return Ok(());
    }

    if !show {
        println!("Settings are looked up at:");
        for path in Settings::candidate_paths() {
            println!("  {}", path.display());
        }
        println!();
    }
    settings.display();
    Ok(())
}

fn print_ingest_summary(summary: &IngestSummary) {
    println!();
    println!("{}", style("Ingest complete").green().bold());
    println!("  Video:    {} ({})", summary.title, summary.video_id);
    println!("  Duration: {}", utils::format_duration(summary.duration));
    println!("  Segments: {}", summary.segments);
    println!("  Archive:  {} ({} files)", summary.archive_key, summary.files_archived);
    println!("  Analysis: {}", summary.analysis_key);
}

fn print_fetch_summary(summary: &FetchSummary) {
    println!();
    println!("{}", style("Fetch complete").green().bold());
    println!("  Archive:  {}", summary.archive.display());
    match &summary.analysis {
        Some(path) => println!("  Analysis: {}", path.display()),
        None => println!("  Analysis: {}", style("not available").yellow()),
    }
    println!("  Total:    {}", utils::format_file_size(summary.bytes));
}

fn print_publish_report(report: &PublishReport) {
    println!();
    println!("{}", style("Publish complete").green().bold());
    println!("  Clips:     {}", report.attempted);
    println!("  Published: {}", style(report.succeeded).green());
    println!("  Skipped:   {}", report.skipped);
    if report.failed > 0 {
        println!("  Failed:    {}", style(report.failed).red());
    } else {
        println!("  Failed:    0");
    }
}
