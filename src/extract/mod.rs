//! Detail page field extraction
//!
//! The walker treats extraction as a pure function of the rendered detail
//! page content. Missing fields are `None`, never errors; an error means the
//! extractor itself is misconfigured.

mod html;

pub use html::HtmlDetailExtractor;

use thiserror::Error;

/// Errors raised by an extractor
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector for {field}: {message}")]
    Selector { field: String, message: String },

    /// Raised by extractors that cannot read the content they were given
    #[error("Extraction failed: {0}")]
    Failed(String),
}

/// Fields read from a detail page, before any business rule is applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: Option<String>,
    pub address: Option<String>,
    pub rating: Option<String>,
    pub email: Option<String>,
}

/// Reads business fields from detail page content
pub trait DetailExtractor: Send + Sync {
    fn extract_email(&self, content: &str) -> Result<Option<String>, ExtractError>;

    fn extract_address(&self, content: &str) -> Result<Option<String>, ExtractError>;

    fn extract_title_and_rating(
        &self,
        content: &str,
    ) -> Result<(Option<String>, Option<String>), ExtractError>;

    /// All fields at once
    fn extract(&self, content: &str) -> Result<RawRecord, ExtractError> {
        let email = self.extract_email(content)?;
        let address = self.extract_address(content)?;
        let (title, rating) = self.extract_title_and_rating(content)?;
        Ok(RawRecord {
            title,
            address,
            rating,
            email,
        })
    }
}
