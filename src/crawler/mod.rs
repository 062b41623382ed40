//! Crawler module for walking the directory hierarchy
//!
//! This module contains the core crawling logic, including:
//! - Discovery of letters, categories, sub-letters and cities
//! - Crash-page detection with bounded reloads
//! - The hierarchy walker and its per-city pagination loop

mod discovery;
mod recovery;
mod walker;

pub use discovery::{
    city_name_from_text, clean_city_name, CategoryLink, CityLink, Directory, LetterLink,
};
pub use recovery::{Health, RecoveryGuard};
pub use walker::Walker;

use std::fmt;

/// What happened to one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The record was appended and the partition document rewritten
    Persisted,

    /// The listing produced no record
    Skipped(SkipReason),
}

/// Why a listing produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// The listing position no longer exists after returning to the list
    MissingListing,

    /// The listing has no title element to click
    MissingTitle,

    /// Opening the detail page failed
    NavigationFailed,

    /// The detail page shows no email address
    NoEmail,

    /// The record was collected by an earlier run
    AlreadyCollected,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingListing => "missing_listing",
            Self::MissingTitle => "missing_title",
            Self::NavigationFailed => "navigation_failed",
            Self::NoEmail => "no_email",
            Self::AlreadyCollected => "already_collected",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
