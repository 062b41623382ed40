//! Hierarchy walker - main crawl orchestration logic
//!
//! The walker drives a depth-first traversal of
//! letter → category → sub-letter → city → result pages → detail pages.
//!
//! Every loop level is a containment boundary: a transient error is logged and
//! counted before the walker moves on to the next sibling. Only fatal errors
//! (see [`CrawlError::is_fatal`]) leave [`Walker::run`].

use crate::backup::BackupScheduler;
use crate::config::{Config, DelayConfig, SelectorConfig, TimeoutConfig};
use crate::crawler::discovery::{CategoryLink, CityLink, Directory, LetterLink};
use crate::crawler::recovery::RecoveryGuard;
use crate::crawler::{RecordOutcome, SkipReason};
use crate::extract::DetailExtractor;
use crate::locale::LocaleResolver;
use crate::output::{CitySummary, RunStatistics};
use crate::page::{click_safely, wait_tolerant, ElementHandle, PageProvider, WaitCondition};
use crate::state::{LeafCursor, LeafState};
use crate::storage::{BusinessRecord, CategoryNode, DatasetStore, HierarchyKey};
use crate::{CrawlError, PageResult, Result};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Scroll step on detail pages, as a fraction of the viewport
const DETAIL_SCROLL_FRACTION: f32 = 1.0 / 3.0;

/// Main crawler structure
///
/// Owns the page session and every piece of run state: the store, the
/// backup tasks and the statistics.
pub struct Walker<P, X> {
    page: P,
    extractor: X,
    store: DatasetStore,
    backups: BackupScheduler,
    guard: RecoveryGuard,
    locales: LocaleResolver,
    directory: Directory,
    selectors: SelectorConfig,
    timeouts: TimeoutConfig,
    delays: DelayConfig,
    resume: bool,
    stats: RunStatistics,
}

impl<P: PageProvider, X: DetailExtractor> Walker<P, X> {
    /// Creates a new walker
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `page` - The page session to drive
    /// * `extractor` - Reads fields from detail pages
    /// * `store` - Receives collected records
    /// * `backups` - Starts backing up every document the store writes
    pub fn new(
        config: &Config,
        page: P,
        extractor: X,
        store: DatasetStore,
        backups: BackupScheduler,
    ) -> Result<Self> {
        Ok(Self {
            page,
            extractor,
            store,
            backups,
            guard: RecoveryGuard::from_config(&config.recovery),
            locales: LocaleResolver::from_config(config),
            directory: Directory::from_config(config)?,
            selectors: config.selectors.clone(),
            timeouts: config.timeouts.clone(),
            delays: config.delays.clone(),
            resume: config.output.resume,
            stats: RunStatistics::default(),
        })
    }

    /// Walks every partition, or only those in `only`
    ///
    /// # Returns
    ///
    /// * `Ok(RunStatistics)` - The hierarchy was exhausted
    /// * `Err(CrawlError)` - The index could not be read, or a fatal error occurred
    pub async fn run(&mut self, only: Option<&[char]>) -> Result<RunStatistics> {
        let started = Instant::now();

        let index = self.directory.index_url()?;
        tracing::info!("Visiting category index {}", index);
        self.page.navigate(&index).await?;
        self.wait_for_body().await;

        let mut letters = self.directory.letters(&mut self.page).await?;
        if letters.is_empty() {
            return Err(CrawlError::EmptyIndex { url: index });
        }
        if let Some(only) = only {
            letters.retain(|link| only.iter().any(|c| c.eq_ignore_ascii_case(&link.letter)));
        }

        for link in &letters {
            let span = tracing::info_span!(
                "partition",
                partition = %link.letter.to_ascii_lowercase()
            );
            let result = self.walk_partition(link).instrument(span).await;
            self.contain(result, "partition", &link.letter.to_string())?;
        }

        self.stats.elapsed = started.elapsed();
        tracing::info!(
            "Harvest completed: {} records persisted from {} cities in {:?}",
            self.stats.persisted,
            self.stats.cities,
            self.stats.elapsed
        );

        Ok(self.stats.clone())
    }

    /// Stops the backup tasks
    pub async fn shutdown(&mut self) {
        self.backups.shutdown().await;
    }

    /// Turns a transient error into "continue with the next sibling"
    fn contain<T>(&mut self, result: Result<T>, level: &str, name: &str) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => {
                tracing::error!("Fatal error in {} {}: {}", level, name, e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Error in {} {}, moving on: {}", level, name, e);
                self.stats.record_failure();
                Ok(None)
            }
        }
    }

    async fn walk_partition(&mut self, link: &LetterLink) -> Result<()> {
        let letter = link.letter;
        self.stats.partitions += 1;

        if self.resume {
            if let Some(document) = self.store.load_partition(letter)? {
                tracing::info!(
                    "Resuming partition {} with {} collected records",
                    letter,
                    document.record_count()
                );
                self.store.restore(letter, document);
            }
        }

        self.directory.dismiss_consent(&mut self.page).await;

        tracing::info!("Visiting letter page {}: {}", letter, link.url);
        self.page.navigate(&link.url).await?;
        self.wait_for_body().await;

        let categories = self.directory.categories(&mut self.page).await?;
        if categories.is_empty() {
            tracing::warn!("No categories found for letter {}", letter);
        } else {
            tracing::info!("Found {} categories for letter {}", categories.len(), letter);
        }

        for category in &categories {
            let span = tracing::info_span!("category", category = %category.slug);
            let result = self.walk_category(letter, category).instrument(span).await;
            self.contain(result, "category", &category.name)?;
        }

        self.persist_partition(letter)
    }

    async fn walk_category(&mut self, letter: char, category: &CategoryLink) -> Result<()> {
        tracing::info!("Category: {} ({})", category.name, category.language);
        let url = self.directory.category_url(category);
        self.page.navigate(&url).await?;
        self.wait_for_body().await;

        let sub_letters = self.directory.sub_letters(&mut self.page).await?;

        let mut node = CategoryNode::new(&category.slug, &category.name, &category.language);
        node.translations = self.locales.resolve(&mut self.page).await;
        self.store.register_category(letter, node.clone());
        self.stats.categories += 1;
        self.persist_partition(letter)?;

        if sub_letters.is_empty() {
            tracing::info!("No sub-letters found for {}", category.name);
            return Ok(());
        }
        tracing::debug!("Sub-letters for {}: {:?}", category.name, sub_letters);

        for sub_letter in sub_letters {
            let result = self
                .walk_sub_letter(letter, category, &node, sub_letter)
                .await;
            self.contain(result, "sub-letter", &sub_letter.to_string())?;
        }

        Ok(())
    }

    async fn walk_sub_letter(
        &mut self,
        letter: char,
        category: &CategoryLink,
        node: &CategoryNode,
        sub_letter: char,
    ) -> Result<()> {
        let url = self.directory.sub_letter_url(category, sub_letter);
        tracing::info!("Opening letter page: {}", url);
        self.page.navigate(&url).await?;
        self.wait_for_body().await;

        let cities = self
            .directory
            .cities(&mut self.page, &category.language)
            .await?;
        tracing::info!("Found {} cities for letter '{}'", cities.len(), sub_letter);

        for city in &cities {
            let span = tracing::info_span!("city", city = %city.name);
            let result = self.walk_city(letter, node, city).instrument(span).await;
            let summary = self.contain(result, "city", &city.name)?;
            self.persist_partition(letter)?;
            if let Some(summary) = summary {
                tracing::info!(
                    "Finished {}: {} persisted, {} skipped over {} pages",
                    summary.name,
                    summary.persisted,
                    summary.skipped_total(),
                    summary.pages
                );
                self.stats.add_city(&summary);
            }
        }

        Ok(())
    }

    /// Runs the leaf state machine over all result pages of one city
    async fn walk_city(
        &mut self,
        letter: char,
        node: &CategoryNode,
        city: &CityLink,
    ) -> Result<CitySummary> {
        let key = HierarchyKey::new(letter, node, &city.name);
        let mut summary = CitySummary::new(&city.name);
        let mut cursor = LeafCursor::new();
        let mut visited = HashSet::new();

        self.store.ensure_city(&key);
        tracing::info!("Opened city: {}", city.name);
        self.page.navigate(&city.url).await?;
        self.wait_for_body().await;

        loop {
            let page_number = cursor.page();
            tracing::info!("Scraping page {} for {}", page_number, city.name);

            let health = self.guard.ensure_healthy(&mut self.page).await;
            if !health.is_healthy() {
                tracing::warn!(
                    "Abandoning {} on unrecoverable page {} after {} reloads",
                    city.name,
                    page_number,
                    health.reloads()
                );
                summary.abandoned = true;
                break;
            }
            if health.reloads() > 0 {
                tracing::info!("Page {} recovered after {} reloads", page_number, health.reloads());
            }

            let list_url = self.page.current_url().await?;
            if !visited.insert(list_url.clone()) {
                tracing::warn!("Result page {} was already visited, stopping pagination", list_url);
                break;
            }
            let count = self.page.find_all(&self.selectors.listing).await?.len();
            tracing::info!("Found {} businesses on page {}", count, page_number);
            if count == 0 {
                break;
            }
            summary.pages += 1;
            summary.listings += count as u32;

            for index in 0..count {
                let outcome = match self.visit_listing(&key, node, &mut cursor, index).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            "Error scraping business #{} in {}: {}",
                            index + 1,
                            city.name,
                            e
                        );
                        summary.failures += 1;
                        None
                    }
                };
                if let Some(outcome) = outcome {
                    summary.record(outcome);
                }

                finish_record(&mut cursor)?;
                if let Err(e) = self.return_to_list(&list_url).await {
                    tracing::warn!("Lost the result list of {}: {}", city.name, e);
                    summary.abandoned = true;
                    cursor.advance(LeafState::Done)?;
                    return Ok(summary);
                }
                pause(match outcome {
                    Some(RecordOutcome::Skipped(_)) => self.delays.after_skip,
                    _ => self.delays.after_back,
                })
                .await;
            }

            let Some(next) = self.next_page_url().await else {
                tracing::info!("No next page, finishing pagination");
                break;
            };
            tracing::info!("Navigating to next page: {}", next);
            if let Err(e) = self.page.navigate(&next).await {
                tracing::warn!("Could not open next page: {}", e);
                break;
            }
            pause(self.delays.next_page).await;
            cursor.next_page()?;
        }

        cursor.advance(LeafState::Done)?;
        Ok(summary)
    }

    /// Opens listing `index` of the current page and collects its record
    ///
    /// The listing is looked up again by position; handles from before the
    /// previous navigation are never reused.
    async fn visit_listing(
        &mut self,
        key: &HierarchyKey,
        node: &CategoryNode,
        cursor: &mut LeafCursor,
        index: usize,
    ) -> Result<RecordOutcome> {
        let listings = self.page.find_all(&self.selectors.listing).await?;
        let Some(listing) = listings.get(index) else {
            tracing::warn!("Business #{} is gone from the list, skipping", index + 1);
            return Ok(RecordOutcome::Skipped(SkipReason::MissingListing));
        };
        let Some(title) = self.listing_title(listing).await? else {
            tracing::warn!("No title element for business #{}, skipping", index + 1);
            return Ok(RecordOutcome::Skipped(SkipReason::MissingTitle));
        };
        cursor.advance(LeafState::RecordSelected)?;

        if let Err(e) = self.page.scroll_into_view(&title).await {
            tracing::debug!("Could not scroll to business #{}: {}", index + 1, e);
        }
        pause(self.delays.scroll).await;
        if let Err(e) = click_safely(&mut self.page, &title).await {
            tracing::warn!("Could not open business #{}: {}", index + 1, e);
            return Ok(RecordOutcome::Skipped(SkipReason::NavigationFailed));
        }

        wait_tolerant(
            &mut self.page,
            WaitCondition::Present(self.selectors.heading.clone()),
            self.timeouts.detail(),
            self.timeouts.poll(),
        )
        .await;
        cursor.advance(LeafState::DetailLoaded)?;

        for _ in 0..self.delays.scroll_steps {
            if let Err(e) = self.page.scroll_by(DETAIL_SCROLL_FRACTION).await {
                tracing::debug!("Scrolling detail page failed: {}", e);
                break;
            }
            pause(self.delays.scroll).await;
        }

        let content = self.page.current_content().await?;
        let raw = self.extractor.extract(&content)?;
        let Some(email) = raw.email else {
            tracing::info!("No email found, skipping professional #{}", index + 1);
            return Ok(RecordOutcome::Skipped(SkipReason::NoEmail));
        };

        let source_url = self.page.current_url().await?;
        if self.resume && self.store.contains_url(key.partition, &source_url) {
            tracing::info!("Already collected {}, skipping", source_url);
            return Ok(RecordOutcome::Skipped(SkipReason::AlreadyCollected));
        }
        if raw.rating.is_none() {
            tracing::debug!("No main rating found for business #{}", index + 1);
        }

        let record = BusinessRecord {
            title: raw.title.unwrap_or_else(|| title.text.clone()),
            address: raw.address,
            rating: raw.rating,
            email,
            category: node.display_name.clone(),
            city: key.city.clone(),
            source_url,
        };
        let saved_title = record.title.clone();

        self.store.append(key, record);
        self.persist_partition(key.partition)?;
        cursor.advance(LeafState::RecordPersisted)?;
        tracing::info!("Saved business: {}", saved_title);

        if !self.guard.ensure_healthy(&mut self.page).await.is_healthy() {
            tracing::warn!("Detail page still broken after saving {}", saved_title);
        }

        Ok(RecordOutcome::Persisted)
    }

    /// Rewrites the partition document and makes sure it is backed up
    fn persist_partition(&mut self, partition: char) -> Result<()> {
        let path = self.store.flatten_and_write(partition)?;
        self.backups.track(&path);
        Ok(())
    }

    /// Clickable title of a listing, trying the fallback selector second
    async fn listing_title(&mut self, listing: &ElementHandle) -> PageResult<Option<ElementHandle>> {
        for selector in [
            &self.selectors.listing_title,
            &self.selectors.listing_title_fallback,
        ] {
            let found = self.page.find_within(listing, selector).await?;
            if let Some(title) = found.into_iter().next() {
                return Ok(Some(title));
            }
        }
        Ok(None)
    }

    /// Goes back to `list_url`, navigating there directly if history fails
    async fn return_to_list(&mut self, list_url: &str) -> PageResult<()> {
        if self.page.current_url().await? == list_url {
            return Ok(());
        }
        if let Err(e) = self.page.back().await {
            tracing::debug!("History back failed: {}", e);
        }
        if self.page.current_url().await? != list_url {
            self.page.navigate(list_url).await?;
        }
        Ok(())
    }

    /// Target of an enabled "next page" control, if any
    async fn next_page_url(&mut self) -> Option<String> {
        match self.page.find_all(&self.selectors.next_page).await {
            Ok(controls) => controls
                .into_iter()
                .filter(|control| control.attr("aria-disabled") != Some("true"))
                .find_map(|control| control.link),
            Err(e) => {
                tracing::debug!("Could not look for next page: {}", e);
                None
            }
        }
    }

    async fn wait_for_body(&mut self) {
        wait_tolerant(
            &mut self.page,
            WaitCondition::Present(self.selectors.body.clone()),
            self.timeouts.page_load(),
            self.timeouts.poll(),
        )
        .await;
    }
}

/// Marks an unfinished record as skipped and returns the cursor to its list page
fn finish_record(cursor: &mut LeafCursor) -> Result<()> {
    if !matches!(
        cursor.state(),
        LeafState::RecordPersisted | LeafState::RecordSkipped
    ) {
        cursor.advance(LeafState::RecordSkipped)?;
    }
    cursor.back_to_list()
}

async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
