//! Configuration module for Directory-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so an empty file (or no file at all) yields a
//! configuration targeting the public directory with the stock layout.
//!
//! # Example
//!
//! ```no_run
//! use directory_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Backups every {}s", config.backup.interval_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AlertConfig, BackupConfig, Config, DelayConfig, LoggingConfig, OutputConfig, RecoveryConfig,
    SelectorConfig, SiteConfig, TimeoutConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
