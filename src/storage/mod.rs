//! Storage module for accumulating and persisting collected records
//!
//! This module handles everything between an extracted record and the JSON
//! document on disk:
//! - In-memory accumulation keyed by partition, category and city
//! - Deterministic projection of one partition into a document
//! - Atomic whole-document rewrites (temporary file + rename)
//! - Reading an existing document back for resumed runs

mod document;
mod store;

pub use document::{CategoryDocument, CityDocument, PersistenceDocument};
pub use store::DatasetStore;

use crate::locale::Translations;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while persisting a partition
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to replace document: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid document {path}: {message}")]
    InvalidDocument { path: String, message: String },
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Address of one traversal leaf
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierarchyKey {
    /// Starting letter of the partition, uppercase
    pub partition: char,
    pub category_slug: String,
    pub language: String,
    pub city: String,
}

impl HierarchyKey {
    pub fn new(partition: char, category: &CategoryNode, city: &str) -> Self {
        Self {
            partition: partition.to_ascii_uppercase(),
            category_slug: category.slug.clone(),
            language: category.language.clone(),
            city: city.to_string(),
        }
    }
}

/// A discovered category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryNode {
    pub slug: String,
    pub display_name: String,
    pub language: String,
    /// Filled by the locale resolver; missing locales are unknown, not errors
    pub translations: Translations,
}

impl CategoryNode {
    pub fn new(slug: &str, display_name: &str, language: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_name: display_name.to_string(),
            language: language.to_string(),
            translations: Translations::new(),
        }
    }
}

/// A collected business
///
/// Records only exist with an email; listings without one never reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub title: String,
    pub address: Option<String>,
    pub rating: Option<String>,
    pub email: String,
    pub category: String,
    pub city: String,
    #[serde(rename = "url")]
    pub source_url: String,
}
