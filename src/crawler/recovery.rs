//! Crash-page detection and bounded reload

use crate::config::RecoveryConfig;
use crate::page::PageProvider;
use std::time::Duration;

/// Result of a recovery check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// The page shows no crash signature, after `reloads` reloads
    Healthy { reloads: u32 },

    /// The page is still crashed (or unreadable) and must be abandoned
    Unrecoverable { reloads: u32 },
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    pub fn reloads(&self) -> u32 {
        match self {
            Self::Healthy { reloads } | Self::Unrecoverable { reloads } => *reloads,
        }
    }
}

/// Detects transient crash pages and reloads them a bounded number of times
#[derive(Debug, Clone)]
pub struct RecoveryGuard {
    max_attempts: u32,
    settle: Duration,
    signatures: Vec<String>,
}

impl RecoveryGuard {
    pub fn new(max_attempts: u32, settle: Duration, signatures: &[String]) -> Self {
        Self {
            max_attempts,
            settle,
            signatures: signatures.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.settle),
            &config.signatures,
        )
    }

    /// Returns true if `content` contains a crash signature (case-insensitive)
    pub fn is_crashed(&self, content: &str) -> bool {
        let content = content.to_lowercase();
        self.signatures
            .iter()
            .any(|signature| content.contains(signature.as_str()))
    }

    /// Checks the current page, reloading while it shows a crash signature
    ///
    /// The page is inspected at most `max_attempts` times and reloaded after
    /// each crashed inspection. Content that cannot be read, or a reload that
    /// fails, ends the check as unrecoverable. Never blocks beyond
    /// `max_attempts` settle intervals.
    pub async fn ensure_healthy<P: PageProvider + ?Sized>(&self, page: &mut P) -> Health {
        let mut reloads = 0;

        for attempt in 1..=self.max_attempts {
            let content = match page.current_content().await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Could not read page during recovery check: {}", e);
                    return Health::Unrecoverable { reloads };
                }
            };

            if !self.is_crashed(&content) {
                return Health::Healthy { reloads };
            }

            tracing::warn!(
                "Application error detected (attempt {}/{}), reloading page",
                attempt,
                self.max_attempts
            );
            if let Err(e) = page.reload().await {
                tracing::warn!("Reload failed: {}", e);
                return Health::Unrecoverable { reloads };
            }
            reloads += 1;
            tokio::time::sleep(self.settle).await;
        }

        tracing::error!("Page still broken after {} reloads", reloads);
        Health::Unrecoverable { reloads }
    }
}
