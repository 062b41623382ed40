//! Directory structure discovery
//!
//! Finds the links of the four hierarchy levels on the pages that list them:
//! - Index letters on the category index
//! - Categories on a letter page
//! - Sub-letters on a category page
//! - Cities on a sub-letter page

use crate::config::{Config, SelectorConfig};
use crate::locale::Locale;
use crate::page::{click_safely, PageProvider, WaitCondition};
use crate::{CrawlError, PageResult};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Upper bound for waiting on the consent banner
const CONSENT_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterLink {
    pub letter: char,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    pub name: String,
    pub slug: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityLink {
    pub name: String,
    pub url: String,
}

/// URL layout and link selectors of the directory
#[derive(Debug, Clone)]
pub struct Directory {
    base: Url,
    index_path: String,
    default_locale: Locale,
    selectors: SelectorConfig,
    element_timeout: Duration,
    poll: Duration,
}

impl Directory {
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        Ok(Self {
            base: Url::parse(&config.site.base_url)?,
            index_path: config.site.index_path.clone(),
            default_locale: Locale::from_code(&config.site.default_language)
                .unwrap_or(Locale::En),
            selectors: config.selectors.clone(),
            element_timeout: config.timeouts.element(),
            poll: config.timeouts.poll(),
        })
    }

    pub fn index_url(&self) -> Result<String, CrawlError> {
        Ok(self.base.join(&self.index_path)?.to_string())
    }

    /// Category page: `{base}/{lang}/{path}/{first letter of slug}/{slug}`
    pub fn category_url(&self, category: &CategoryLink) -> String {
        let locale = Locale::from_code(&category.language).unwrap_or(self.default_locale);
        let first = category
            .slug
            .chars()
            .next()
            .map(|c| c.to_lowercase().to_string())
            .unwrap_or_default();
        format!(
            "{}/{}/{}/{}/{}",
            self.base.as_str().trim_end_matches('/'),
            locale.code(),
            locale.category_path(),
            first,
            category.slug
        )
    }

    /// City list for one sub-letter of a category
    pub fn sub_letter_url(&self, category: &CategoryLink, letter: char) -> String {
        format!("{}/{}", self.category_url(category), letter)
    }

    /// Index letters, uppercased, in page order
    pub async fn letters<P: PageProvider + ?Sized>(
        &self,
        page: &mut P,
    ) -> PageResult<Vec<LetterLink>> {
        let mut seen = HashSet::new();
        let mut letters = Vec::new();

        for anchor in page.find_all(&self.selectors.letter_links).await? {
            let Some(letter) = single_letter(&anchor.text) else {
                continue;
            };
            let Some(url) = anchor.link else {
                continue;
            };
            let letter = letter.to_ascii_uppercase();
            if seen.insert(letter) {
                tracing::debug!("Found letter link: {} -> {}", letter, url);
                letters.push(LetterLink { letter, url });
            }
        }

        tracing::info!("Total enabled letters: {}", letters.len());
        Ok(letters)
    }

    /// Categories listed on the current letter page
    pub async fn categories<P: PageProvider + ?Sized>(
        &self,
        page: &mut P,
    ) -> PageResult<Vec<CategoryLink>> {
        let mut seen = HashSet::new();
        let mut categories = Vec::new();

        let container = page
            .find_all(&self.selectors.category_container)
            .await?
            .into_iter()
            .find(|div| div.attr("class").is_some_and(is_category_container_class));
        let Some(container) = container else {
            tracing::debug!("No category container on letter page");
            return Ok(categories);
        };

        for anchor in page
            .find_within(&container, &self.selectors.category_links)
            .await?
        {
            let name = anchor.text.trim();
            if name.is_empty() || single_letter(name).is_some() {
                continue;
            }
            let Some(slug) = anchor.link.as_deref().and_then(category_slug) else {
                continue;
            };
            if seen.insert(slug.clone()) {
                tracing::debug!("Found category: {} ({})", name, slug);
                categories.push(CategoryLink {
                    name: name.to_string(),
                    slug,
                    language: self.default_locale.code().to_string(),
                });
            }
        }

        Ok(categories)
    }

    /// Sub-letters on the current category page, lowercased, sorted, unique
    pub async fn sub_letters<P: PageProvider + ?Sized>(&self, page: &mut P) -> PageResult<Vec<char>> {
        let mut letters: Vec<char> = page
            .find_all(&self.selectors.sub_letter_links)
            .await?
            .iter()
            .filter_map(|anchor| single_letter(&anchor.text))
            .map(|letter| letter.to_ascii_lowercase())
            .collect();
        letters.sort_unstable();
        letters.dedup();
        Ok(letters)
    }

    /// Cities on the current sub-letter page
    pub async fn cities<P: PageProvider + ?Sized>(
        &self,
        page: &mut P,
        language: &str,
    ) -> PageResult<Vec<CityLink>> {
        let mut anchors: Vec<_> = page
            .find_all(&self.selectors.city_links)
            .await?
            .into_iter()
            .filter(|anchor| anchor.text.contains("in "))
            .collect();
        if anchors.is_empty() {
            anchors = page.find_all(&self.selectors.city_links_fallback).await?;
        }

        let mut seen = HashSet::new();
        let mut cities = Vec::new();
        for anchor in anchors {
            let text = anchor.text.trim();
            let Some(url) = anchor.link else {
                continue;
            };
            if text.is_empty() || !seen.insert(url.clone()) {
                continue;
            }
            let name = clean_city_name(&city_name_from_text(text), language);
            if name.is_empty() {
                continue;
            }
            cities.push(CityLink { name, url });
        }

        Ok(cities)
    }

    /// Accepts the cookie banner if it shows up; absence is normal
    pub async fn dismiss_consent<P: PageProvider + ?Sized>(&self, page: &mut P) {
        let condition = WaitCondition::Present(self.selectors.consent_button.clone());
        let wait = self.element_timeout.min(CONSENT_WAIT);
        match page.wait_until(&condition, wait, self.poll).await {
            Ok(true) => {}
            _ => {
                tracing::debug!("No cookie popup found");
                return;
            }
        }

        let button = match page.find_all(&self.selectors.consent_button).await {
            Ok(buttons) => buttons.into_iter().next(),
            Err(_) => None,
        };
        if let Some(button) = button {
            if let Err(e) = click_safely(page, &button).await {
                tracing::debug!("Could not accept cookies: {}", e);
            }
        }
    }
}

/// True for class lists with a `c` + digits token, e.g. "c12 grid"
fn is_category_container_class(class: &str) -> bool {
    class.split_whitespace().any(|token| {
        token.len() > 1
            && token.starts_with('c')
            && token[1..].chars().all(|c| c.is_ascii_digit())
    })
}

fn single_letter(text: &str) -> Option<char> {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Some(c),
        _ => None,
    }
}

/// Last path segment of a category link; language roots like `/en` have none
fn category_slug(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() < 2 {
        return None;
    }
    segments.last().map(|slug| slug.to_string())
}

/// "Bakeries in Bern" -> "Bern"; without "in ", the text after the last dot
pub fn city_name_from_text(text: &str) -> String {
    match text.rsplit_once("in ") {
        Some((_, city)) => city.trim().to_string(),
        None => text.rsplit('.').next().unwrap_or(text).trim().to_string(),
    }
}

/// Strips localized lead-ins: "Boulangeries à Genève" -> "Genève" for French,
/// "Panetterie a Lugano" -> "Lugano" for Italian
pub fn clean_city_name(raw: &str, language: &str) -> String {
    let marker = match language {
        "fr" => Some("à "),
        "it" => Some("a "),
        _ => None,
    };
    match marker.and_then(|marker| raw.split_once(marker)) {
        Some((_, city)) => city.trim().to_string(),
        None => raw.trim().to_string(),
    }
}
