//! Locale switching and localized category names
//!
//! For every category the walker collects the category's name in each
//! supported language by switching the page locale through the language menu
//! and reading the page heading. A failed locale yields an absent name, never
//! an error, and the default locale is restored before control returns.

mod normalize;

pub use normalize::normalize_heading;

use crate::config::Config;
use crate::page::{click_safely, first_text, wait_tolerant, PageProvider, WaitCondition};
use crate::PageError;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Languages offered by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locale {
    En,
    De,
    Fr,
    It,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::En, Locale::De, Locale::Fr, Locale::It];

    /// Parses a lowercase or uppercase locale code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "de" => Some(Self::De),
            "fr" => Some(Self::Fr),
            "it" => Some(Self::It),
            _ => None,
        }
    }

    /// URL path code, e.g. "de"
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::It => "it",
        }
    }

    /// Label shown in the language menu, e.g. "DE"
    pub fn label(&self) -> &'static str {
        match self {
            Self::En => "EN",
            Self::De => "DE",
            Self::Fr => "FR",
            Self::It => "IT",
        }
    }

    /// Localized path segment of the category tree
    pub fn category_path(&self) -> &'static str {
        match self {
            Self::De => "kategorien",
            Self::It => "categorie",
            Self::En | Self::Fr => "categories",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Category name per locale; `None` when that locale could not be read
pub type Translations = BTreeMap<Locale, Option<String>>;

/// Errors while reading one locale
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Language menu not available")]
    MenuUnavailable,

    #[error("Language option {0} not available")]
    OptionUnavailable(Locale),

    #[error("Page has no heading")]
    MissingHeading,
}

/// Switches page locales and reads localized category names
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    locales: Vec<Locale>,
    default: Locale,
    heading: String,
    current_language: String,
    language_menu: String,
    language_option: String,
    element_timeout: Duration,
    heading_timeout: Duration,
    poll: Duration,
    switch_delay: Duration,
}

impl LocaleResolver {
    pub fn from_config(config: &Config) -> Self {
        let locales = config
            .site
            .locales
            .iter()
            .filter_map(|code| Locale::from_code(code))
            .collect();
        Self {
            locales,
            default: Locale::from_code(&config.site.default_language).unwrap_or(Locale::En),
            heading: config.selectors.heading.clone(),
            current_language: config.selectors.current_language.clone(),
            language_menu: config.selectors.language_menu.clone(),
            language_option: config.selectors.language_option.clone(),
            element_timeout: config.timeouts.element(),
            heading_timeout: config.timeouts.heading_change(),
            poll: config.timeouts.poll(),
            switch_delay: Duration::from_millis(config.delays.locale_switch),
        }
    }

    /// Reads the current page's category name in every configured locale
    ///
    /// The page is back in the default locale afterwards, whether or not the
    /// individual switches succeeded.
    pub async fn resolve<P: PageProvider + ?Sized>(&self, page: &mut P) -> Translations {
        let mut translations = Translations::new();

        for &locale in &self.locales {
            tracing::info!("Switching to language [{}]", locale);
            let name = match self.read_locale(page, locale).await {
                Ok(name) => {
                    tracing::info!("Extracted [{}]: {}", locale, name);
                    Some(name)
                }
                Err(err) => {
                    tracing::warn!("Failed to fetch category name for {}: {}", locale, err);
                    None
                }
            };
            translations.insert(locale, name);
        }

        if let Err(err) = self.restore_default(page).await {
            tracing::warn!("Failed to switch back to {}: {}", self.default, err);
        }

        translations
    }

    async fn read_locale<P: PageProvider + ?Sized>(
        &self,
        page: &mut P,
        locale: Locale,
    ) -> Result<String, LocaleError> {
        self.dismiss_overlays(page).await;

        let old_heading = first_text(page, &self.heading)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        if !self.is_active(page, locale).await {
            self.switch_to(page, locale).await?;

            let changed = wait_tolerant(
                page,
                WaitCondition::TextChanged {
                    selector: self.heading.clone(),
                    from: old_heading,
                },
                self.heading_timeout,
                self.poll,
            )
            .await;
            if !changed {
                tracing::warn!(
                    "Heading did not change for {}, continuing with current text",
                    locale
                );
            }
        }

        let heading = first_text(page, &self.heading)
            .await?
            .ok_or(LocaleError::MissingHeading)?;
        let name = normalize_heading(&heading, locale);
        tracing::debug!("Cleaned category for [{}]: '{}' -> '{}'", locale, heading, name);

        tokio::time::sleep(self.switch_delay).await;
        Ok(name)
    }

    async fn restore_default<P: PageProvider + ?Sized>(
        &self,
        page: &mut P,
    ) -> Result<(), LocaleError> {
        self.dismiss_overlays(page).await;
        if self.is_active(page, self.default).await {
            return Ok(());
        }
        self.switch_to(page, self.default).await?;
        tracing::info!("Switched back to {}", self.default);
        tokio::time::sleep(self.switch_delay).await;
        Ok(())
    }

    /// Whether the language button already shows `locale`; unknown counts as inactive
    async fn is_active<P: PageProvider + ?Sized>(&self, page: &mut P, locale: Locale) -> bool {
        match first_text(page, &self.current_language).await {
            Ok(Some(label)) => label.eq_ignore_ascii_case(locale.label()),
            _ => false,
        }
    }

    async fn switch_to<P: PageProvider + ?Sized>(
        &self,
        page: &mut P,
        locale: Locale,
    ) -> Result<(), LocaleError> {
        let menu_ready = page
            .wait_until(
                &WaitCondition::Present(self.language_menu.clone()),
                self.element_timeout,
                self.poll,
            )
            .await?;
        if !menu_ready {
            return Err(LocaleError::MenuUnavailable);
        }
        let menu = page
            .find_all(&self.language_menu)
            .await?
            .into_iter()
            .next()
            .ok_or(LocaleError::MenuUnavailable)?;
        click_safely(page, &menu).await?;
        tokio::time::sleep(self.switch_delay).await;

        let option_ready = page
            .wait_until(
                &WaitCondition::WithText {
                    selector: self.language_option.clone(),
                    text: locale.label().to_string(),
                },
                self.element_timeout,
                self.poll,
            )
            .await?;
        if !option_ready {
            return Err(LocaleError::OptionUnavailable(locale));
        }
        let option = page
            .find_all(&self.language_option)
            .await?
            .into_iter()
            .find(|element| element.text.trim() == locale.label())
            .ok_or(LocaleError::OptionUnavailable(locale))?;
        click_safely(page, &option).await?;
        Ok(())
    }

    async fn dismiss_overlays<P: PageProvider + ?Sized>(&self, page: &mut P) {
        if let Err(err) = page.dismiss_overlays().await {
            tracing::debug!("Could not dismiss overlays: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlSession;
    use crate::testing::{quick_config, FakeSite};

    fn localized_page(lang: &str, heading: &str) -> String {
        format!(
            r#"<html><body>
            <button aria-label="current language">{upper}</button>
            <a href="/{lang}/bakeries"><button aria-label="open menu">Menu</button></a>
            <ul role="listbox">
              <li><a href="/en/bakeries">EN</a></li>
              <li><a href="/de/bakeries">DE</a></li>
              <li><a href="/fr/bakeries">FR</a></li>
              <li><a href="/it/bakeries">IT</a></li>
            </ul>
            <h1>{heading}</h1>
            </body></html>"#,
            upper = lang.to_uppercase(),
            lang = lang,
            heading = heading
        )
    }

    fn site() -> FakeSite {
        let site = FakeSite::new("https://dir.test");
        site.page("/en/bakeries", &localized_page("en", "Top cities for Bakeries in"));
        site.page("/de/bakeries", &localized_page("de", "Top Städte für Bäckereien in"));
        site.page("/fr/bakeries", &localized_page("fr", "Top villes pour Boulangeries"));
        site.page(
            "/it/bakeries",
            &localized_page("it", "Città più importanti per Panetterie per"),
        );
        site
    }

    fn resolver() -> LocaleResolver {
        LocaleResolver::from_config(&quick_config())
    }

    #[test]
    fn test_locale_codes() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_code(locale.code()), Some(locale));
            assert_eq!(Locale::from_code(locale.label()), Some(locale));
        }
        assert_eq!(Locale::from_code("es"), None);
        assert_eq!(Locale::De.category_path(), "kategorien");
        assert_eq!(Locale::It.category_path(), "categorie");
        assert_eq!(Locale::Fr.category_path(), "categories");
    }

    #[tokio::test]
    async fn test_resolve_all_locales_and_restore_default() {
        let site = site();
        let mut page = HtmlSession::new(site.clone());
        page.navigate("https://dir.test/en/bakeries").await.unwrap();

        let translations = resolver().resolve(&mut page).await;

        assert_eq!(translations[&Locale::En].as_deref(), Some("Bakeries"));
        assert_eq!(translations[&Locale::De].as_deref(), Some("Bäckereien"));
        assert_eq!(translations[&Locale::Fr].as_deref(), Some("Boulangeries"));
        assert_eq!(translations[&Locale::It].as_deref(), Some("Panetterie"));
        assert_eq!(
            page.current_url().await.unwrap(),
            "https://dir.test/en/bakeries"
        );
    }

    #[tokio::test]
    async fn test_failed_locale_is_absent_not_fatal() {
        let site = site();
        site.remove("/fr/bakeries");
        let mut page = HtmlSession::new(site.clone());
        page.navigate("https://dir.test/en/bakeries").await.unwrap();

        let translations = resolver().resolve(&mut page).await;

        assert_eq!(translations.len(), 4);
        assert_eq!(translations[&Locale::Fr], None);
        assert_eq!(translations[&Locale::It].as_deref(), Some("Panetterie"));
        assert_eq!(
            page.current_url().await.unwrap(),
            "https://dir.test/en/bakeries"
        );
    }

    #[tokio::test]
    async fn test_no_language_menu_reads_current_heading_only() {
        let site = FakeSite::new("https://dir.test");
        site.page(
            "/en/plumbers",
            "<html><body><button aria-label='current language'>EN</button><h1>Top cities for Plumbers in</h1></body></html>",
        );
        let mut page = HtmlSession::new(site.clone());
        page.navigate("https://dir.test/en/plumbers").await.unwrap();

        let translations = resolver().resolve(&mut page).await;

        assert_eq!(translations[&Locale::En].as_deref(), Some("Plumbers"));
        assert_eq!(translations[&Locale::De], None);
        assert_eq!(translations[&Locale::It], None);
    }
}
