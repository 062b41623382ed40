//! Directory-Harvest: a resumable business directory crawler
//!
//! This crate walks a multi-level, paginated, multilingual business directory
//! (letter → category → sub-letter → city → result pages → detail pages),
//! extracts contact records and accumulates them into one JSON document per
//! starting letter, with periodic timestamped backups.

pub mod alert;
pub mod backup;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod locale;
pub mod logging;
pub mod output;
pub mod page;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

use thiserror::Error;

/// Main error type for Directory-Harvest operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No letter links found on directory index {url}")]
    EmptyIndex { url: String },

    #[error("Invalid leaf transition: {from} -> {to}")]
    InvalidTransition {
        from: state::LeafState,
        to: state::LeafState,
    },
}

impl CrawlError {
    /// Returns true if this error must terminate the run
    ///
    /// Losing the ability to write collected data is fatal. Everything the
    /// remote site can do to us (crashes, timeouts, missing elements) is
    /// contained at the loop level where it happens.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Io(_)
                | Self::Json(_)
                | Self::Config(_)
                | Self::EmptyIndex { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}' for {field}")]
    InvalidSelector { field: String, selector: String },
}

/// Errors raised by a page provider
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No page loaded")]
    NoPage,

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Element {0} no longer present")]
    StaleElement(String),

    #[error("Element {0} is not clickable")]
    NotClickable(String),

    #[error("No history to go back to")]
    NoHistory,

    #[error("Timed out after {millis}ms waiting for {condition}")]
    Timeout { condition: String, millis: u64 },
}

/// Result type alias for Directory-Harvest operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for page provider operations
pub type PageResult<T> = std::result::Result<T, PageError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{RecordOutcome, SkipReason, Walker};
pub use locale::{normalize_heading, Locale, LocaleResolver};
pub use page::{DocumentSource, ElementHandle, HtmlSession, HttpSource, PageProvider};
pub use storage::{BusinessRecord, CategoryNode, DatasetStore, HierarchyKey};
