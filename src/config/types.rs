use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Directory-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub timeouts: TimeoutConfig,
    pub delays: DelayConfig,
    pub recovery: RecoveryConfig,
    pub output: OutputConfig,
    pub backup: BackupConfig,
    pub logging: LoggingConfig,
    pub alerts: AlertConfig,
    pub selectors: SelectorConfig,
}

/// Target directory site
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host of the directory, e.g. "https://www.local.ch"
    pub base_url: String,

    /// Path of the A-Z category index, relative to the base URL
    pub index_path: String,

    /// Language the crawl navigates in, restored after each locale sweep
    pub default_language: String,

    /// Locale codes whose category names are collected
    pub locales: Vec<String>,

    /// User agent sent by the HTTP document source
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.local.ch".to_string(),
            index_path: "/en/categories".to_string(),
            default_language: "en".to_string(),
            locales: vec![
                "en".to_string(),
                "de".to_string(),
                "fr".to_string(),
                "it".to_string(),
            ],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Upper bounds for waits on the page provider (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutConfig {
    /// Waiting for the body of a freshly navigated page
    pub page_load: u64,

    /// Waiting for an interactive element (menus, buttons)
    pub element: u64,

    /// Waiting for a detail page heading
    pub detail: u64,

    /// Waiting for the heading to change after a locale switch
    pub heading_change: u64,

    /// Polling period used by `wait_until`
    pub poll: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_load: 6000,
            element: 8000,
            detail: 6000,
            heading_change: 8000,
            poll: 100,
        }
    }
}

impl TimeoutConfig {
    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element)
    }

    pub fn detail(&self) -> Duration {
        Duration::from_millis(self.detail)
    }

    pub fn heading_change(&self) -> Duration {
        Duration::from_millis(self.heading_change)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll)
    }
}

/// Pauses between interactions (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DelayConfig {
    /// After navigating back from a persisted record
    pub after_back: u64,

    /// After navigating back from a skipped record
    pub after_skip: u64,

    /// After loading the next result page
    pub next_page: u64,

    /// Between scroll steps on a detail page
    pub scroll: u64,

    /// Number of scroll steps used to reveal lazily rendered contact data
    pub scroll_steps: u32,

    /// After each locale switch
    pub locale_switch: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            after_back: 800,
            after_skip: 600,
            next_page: 1000,
            scroll: 300,
            scroll_steps: 3,
            locale_switch: 500,
        }
    }
}

impl DelayConfig {
    /// All pauses set to zero, for tests and replayed sites
    pub fn none() -> Self {
        Self {
            after_back: 0,
            after_skip: 0,
            next_page: 0,
            scroll: 0,
            scroll_steps: 0,
            locale_switch: 0,
        }
    }
}

/// Crash page recovery policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RecoveryConfig {
    /// Maximum number of reloads before a page is declared unusable
    pub max_attempts: u32,

    /// Pause after each reload (milliseconds)
    pub settle: u64,

    /// Case-insensitive markers of a crashed render
    pub signatures: Vec<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            settle: 4000,
            signatures: vec![
                "application error".to_string(),
                "client-side exception".to_string(),
            ],
        }
    }
}

/// Output documents
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving one JSON document per partition letter
    pub data_dir: PathBuf,

    /// Document file name prefix, completed with `_<letter>.json`
    pub file_prefix: String,

    /// Backup root, relative to `data_dir` unless absolute
    pub backup_dir: PathBuf,

    /// Load existing partition documents and skip already collected detail pages
    pub resume: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("scraping_data"),
            file_prefix: "localch_live".to_string(),
            backup_dir: PathBuf::from("backup_json"),
            resume: false,
        }
    }
}

impl OutputConfig {
    /// Resolved backup root directory
    pub fn backup_root(&self) -> PathBuf {
        if self.backup_dir.is_absolute() {
            self.backup_dir.clone()
        } else {
            self.data_dir.join(&self.backup_dir)
        }
    }
}

/// Backup schedule
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackupConfig {
    /// Seconds between two snapshots of the same document
    pub interval_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

impl BackupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Run log output
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Fatal failure alerts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AlertConfig {
    /// Directory an external mailer polls for outgoing alerts; log-only when unset
    pub outbox_dir: Option<PathBuf>,
    pub sender: String,
    pub recipient: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            outbox_dir: None,
            sender: "alerts@localhost".to_string(),
            recipient: "operator@localhost".to_string(),
        }
    }
}

/// CSS selectors describing the directory layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub letter_links: String,
    /// Candidate category containers; the first whose class has a `c<digits>` token wins
    pub category_container: String,
    /// Category anchors inside the container
    pub category_links: String,
    pub sub_letter_links: String,
    pub city_links: String,
    pub city_links_fallback: String,
    pub consent_button: String,
    pub listing: String,
    pub listing_title: String,
    pub listing_title_fallback: String,
    pub next_page: String,
    pub heading: String,
    pub body: String,
    pub current_language: String,
    pub language_menu: String,
    pub language_option: String,
    pub email_link: String,
    pub address_section: String,
    pub address_parts: String,
    pub ratings_section: String,
    pub average_rating: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            letter_links: "h2 + div a[href]".to_string(),
            category_container: "div[class]".to_string(),
            category_links: "a[href]".to_string(),
            sub_letter_links: "a[href]".to_string(),
            city_links: "a[href]".to_string(),
            city_links_fallback: "div[class*='cC'] a[href]".to_string(),
            consent_button: "button.ot-sdk-btn, button#onetrust-accept-btn-handler".to_string(),
            listing: "article[data-testid*='list-element-desktop']".to_string(),
            listing_title: "h2[data-testid='title']".to_string(),
            listing_title_fallback: "h2[class*='lk']".to_string(),
            next_page: "button#load-next-page:not([disabled])".to_string(),
            heading: "h1".to_string(),
            body: "body".to_string(),
            current_language: "button[aria-label='current language']".to_string(),
            language_menu: "button[aria-label='open menu']".to_string(),
            language_option: "ul[role='listbox'] li *".to_string(),
            email_link: "a[data-testid='contact-link'][href^='mailto:']".to_string(),
            address_section: "div[data-cy='detail-map-preview']".to_string(),
            address_parts: "span:not(.sh)".to_string(),
            ratings_section: "div[data-testid='ratings-section']".to_string(),
            average_rating: "span[data-testid='average-rating']".to_string(),
        }
    }
}

impl SelectorConfig {
    /// All selectors with their config key, for validation
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("letter-links", self.letter_links.as_str()),
            ("category-container", self.category_container.as_str()),
            ("category-links", self.category_links.as_str()),
            ("sub-letter-links", self.sub_letter_links.as_str()),
            ("city-links", self.city_links.as_str()),
            ("city-links-fallback", self.city_links_fallback.as_str()),
            ("consent-button", self.consent_button.as_str()),
            ("listing", self.listing.as_str()),
            ("listing-title", self.listing_title.as_str()),
            ("listing-title-fallback", self.listing_title_fallback.as_str()),
            ("next-page", self.next_page.as_str()),
            ("heading", self.heading.as_str()),
            ("body", self.body.as_str()),
            ("current-language", self.current_language.as_str()),
            ("language-menu", self.language_menu.as_str()),
            ("language-option", self.language_option.as_str()),
            ("email-link", self.email_link.as_str()),
            ("address-section", self.address_section.as_str()),
            ("address-parts", self.address_parts.as_str()),
            ("ratings-section", self.ratings_section.as_str()),
            ("average-rating", self.average_rating.as_str()),
        ]
    }
}
