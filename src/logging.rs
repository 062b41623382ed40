//! Logging setup with a per-run log file
//!
//! Every run gets an identifier (`YYYYMMDD_HHMMSS`, local time) and writes:
//! - Compact, human-readable lines to stdout
//! - The same lines, without colors, to `{log_dir}/{prefix}_log_{run_id}.log`
//!
//! The walker opens `partition`, `category` and `city` spans, so every line
//! logged while crawling carries the partition letter it belongs to.

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier of a run, e.g. `20240131_142501`
pub fn new_run_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// File name of a run's log
pub fn log_file_name(file_prefix: &str, run_id: &str) -> String {
    format!("{}_log_{}.log", file_prefix, run_id)
}

/// Log filter for the given verbosity; `RUST_LOG` wins when set
pub fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if quiet {
        return EnvFilter::new("error");
    }
    match verbose {
        0 => EnvFilter::new("directory_harvest=info,warn"),
        1 => EnvFilter::new("directory_harvest=debug,info"),
        2 => EnvFilter::new("directory_harvest=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Installs the global subscriber
///
/// # Arguments
///
/// * `log_dir` - Directory for the run's log file, created if missing
/// * `file_prefix` - Prefix shared with the data documents
/// * `run_id` - Identifier from [`new_run_id`]
/// * `verbose` / `quiet` - Command line verbosity
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the log file
/// * `Err` - The directory could not be created or a subscriber is already set
pub fn init_logging(
    log_dir: &Path,
    file_prefix: &str,
    run_id: &str,
    verbose: u8,
    quiet: bool,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(log_dir)?;
    let file_name = log_file_name(file_prefix, run_id);

    let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_filter(filter_for(verbose, quiet));

    let stdout_layer = fmt::layer()
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .compact()
        .with_filter(filter_for(verbose, quiet));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    // The guard flushes the file writer on drop; it has to live until exit
    Box::leak(Box::new(file_guard));

    let path = log_dir.join(file_name);
    tracing::debug!("Logging to {}", path.display());
    Ok(path)
}
