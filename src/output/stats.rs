//! Run statistics
//!
//! This module provides the counters the walker keeps while crawling and
//! the end-of-run summary printed by the binary.

use crate::crawler::{RecordOutcome, SkipReason};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one city
#[derive(Debug, Clone, Default)]
pub struct CitySummary {
    pub name: String,

    /// List pages enumerated
    pub pages: u32,

    /// Listings seen across all pages
    pub listings: u32,

    pub persisted: u32,

    /// Skipped listings by reason
    pub skipped: BTreeMap<SkipReason, u32>,

    /// Listings that failed with a contained error
    pub failures: u32,

    /// Pagination stopped on an unrecoverable page
    pub abandoned: bool,
}

impl CitySummary {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Persisted => self.persisted += 1,
            RecordOutcome::Skipped(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
        }
    }

    pub fn skipped_total(&self) -> u32 {
        self.skipped.values().sum()
    }
}

/// Counters for a whole run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub partitions: u32,
    pub categories: u32,
    pub cities: u32,
    pub pages: u32,
    pub listings: u32,
    pub persisted: u32,
    pub skipped: BTreeMap<SkipReason, u32>,

    /// Errors contained at a loop boundary (listing, city, category, partition)
    pub contained_failures: u32,

    /// Cities whose pagination stopped on a crashed page
    pub abandoned_cities: u32,

    pub elapsed: Duration,
}

impl RunStatistics {
    /// Folds a finished city into the run totals
    pub fn add_city(&mut self, city: &CitySummary) {
        self.cities += 1;
        self.pages += city.pages;
        self.listings += city.listings;
        self.persisted += city.persisted;
        self.contained_failures += city.failures;
        if city.abandoned {
            self.abandoned_cities += 1;
        }
        for (reason, count) in &city.skipped {
            *self.skipped.entry(*reason).or_insert(0) += count;
        }
    }

    pub fn record_failure(&mut self) {
        self.contained_failures += 1;
    }

    pub fn skipped_total(&self) -> u32 {
        self.skipped.values().sum()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Partitions visited: {}", stats.partitions);
    println!("  Categories visited: {}", stats.categories);
    println!("  Cities visited: {}", stats.cities);
    println!("  List pages: {}", stats.pages);
    println!("  Listings seen: {}", stats.listings);
    println!();

    println!("Records:");
    println!("  Persisted: {}", stats.persisted);
    println!("  Skipped: {}", stats.skipped_total());
    for (reason, count) in &stats.skipped {
        println!("    {}: {}", reason, count);
    }
    println!();

    if stats.contained_failures > 0 || stats.abandoned_cities > 0 {
        println!("Failures:");
        println!("  Contained errors: {}", stats.contained_failures);
        println!("  Abandoned cities: {}", stats.abandoned_cities);
        println!();
    }

    let yield_rate = if stats.listings > 0 {
        (stats.persisted as f64 / stats.listings as f64) * 100.0
    } else {
        0.0
    };
    println!("Email yield: {:.1}%", yield_rate);
    println!("Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
}
