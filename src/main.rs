//! Directory-Harvest main entry point
//!
//! This is the command-line interface for the Directory-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use directory_harvest::alert::{dispatch, sink_from_config, Alert};
use directory_harvest::backup::BackupScheduler;
use directory_harvest::config::{load_config_with_hash, Config};
use directory_harvest::extract::HtmlDetailExtractor;
use directory_harvest::logging::{init_logging, new_run_id};
use directory_harvest::output::print_statistics;
use directory_harvest::{DatasetStore, HtmlSession, HttpSource, Walker};
use std::path::PathBuf;

/// Directory-Harvest: a resumable business directory crawler
///
/// Directory-Harvest walks a multilingual business directory from its A-Z
/// category index down to individual detail pages, keeps one JSON document
/// per starting letter and backs those documents up while it runs.
#[derive(Parser, Debug)]
#[command(name = "directory-harvest")]
#[command(version)]
#[command(about = "A resumable business directory crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Load existing documents and skip detail pages already collected
    #[arg(long)]
    resume: bool,

    /// Only walk these partition letters (e.g. --letters a,b,c)
    #[arg(long, value_delimiter = ',')]
    letters: Vec<char>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_hash) = match &cli.config {
        Some(path) => load_config_with_hash(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => (Config::default(), "defaults".to_string()),
    };
    if cli.resume {
        config.output.resume = true;
    }

    let run_id = new_run_id();
    let log_path = init_logging(
        &config.logging.log_dir,
        &config.output.file_prefix,
        &run_id,
        cli.verbose,
        cli.quiet,
    )
    .map_err(|e| anyhow::anyhow!("Failed to set up logging: {}", e))?;

    tracing::info!("Run {} logging to {}", run_id, log_path.display());
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.letters);
        return Ok(());
    }

    handle_crawl(config, &cli.letters, &run_id).await
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, letters: &[char]) {
    println!("=== Directory-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Index: {}", config.site.index_path);
    println!("  Default language: {}", config.site.default_language);
    println!("  Locales: {}", config.site.locales.join(", "));
    if letters.is_empty() {
        println!("  Partitions: all");
    } else {
        let letters: Vec<String> = letters.iter().map(|c| c.to_string()).collect();
        println!("  Partitions: {}", letters.join(", "));
    }

    println!("\nRecovery:");
    println!("  Max attempts: {}", config.recovery.max_attempts);
    println!("  Settle: {}ms", config.recovery.settle);
    println!("  Signatures: {}", config.recovery.signatures.join(", "));

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir.display());
    println!("  File prefix: {}", config.output.file_prefix);
    println!("  Backups: {}", config.output.backup_root().display());
    println!("  Backup interval: {}s", config.backup.interval_secs);
    println!("  Resume: {}", config.output.resume);
    println!("  Logs: {}", config.logging.log_dir.display());

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, letters: &[char], run_id: &str) -> anyhow::Result<()> {
    let source = HttpSource::new(&config.site.user_agent, config.timeouts.page_load())
        .context("Failed to build HTTP client")?;
    let page = HtmlSession::new(source);
    let extractor =
        HtmlDetailExtractor::new(&config.selectors).context("Invalid detail selectors")?;
    let store = DatasetStore::from_config(&config.output);
    let backups = BackupScheduler::new(config.output.backup_root(), config.backup.interval());
    let sink = sink_from_config(&config.alerts);

    let mut walker = Walker::new(&config, page, extractor, store, backups)?;

    if config.output.resume {
        tracing::info!("Starting crawl (resuming from existing documents)");
    } else {
        tracing::info!("Starting fresh crawl");
    }

    let only = (!letters.is_empty()).then_some(letters);
    let result = walker.run(only).await;
    walker.shutdown().await;

    match result {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            dispatch(sink.as_ref(), &Alert::fatal(&e, run_id));
            Err(e.into())
        }
    }
}
