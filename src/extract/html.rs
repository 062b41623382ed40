use crate::config::SelectorConfig;
use crate::extract::{DetailExtractor, ExtractError};
use scraper::{ElementRef, Html, Selector};

/// CSS-selector based extractor for directory detail pages
#[derive(Debug, Clone)]
pub struct HtmlDetailExtractor {
    email_link: Selector,
    address_section: Selector,
    address_parts: Selector,
    heading: Selector,
    ratings_section: Selector,
    average_rating: Selector,
}

impl HtmlDetailExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            email_link: compile("email-link", &selectors.email_link)?,
            address_section: compile("address-section", &selectors.address_section)?,
            address_parts: compile("address-parts", &selectors.address_parts)?,
            heading: compile("heading", &selectors.heading)?,
            ratings_section: compile("ratings-section", &selectors.ratings_section)?,
            average_rating: compile("average-rating", &selectors.average_rating)?,
        })
    }
}

fn compile(field: &str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        field: field.to_string(),
        message: format!("{:?}", e),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

impl DetailExtractor for HtmlDetailExtractor {
    /// Visible text of the contact `mailto:` link, or its address when the text is empty
    fn extract_email(&self, content: &str) -> Result<Option<String>, ExtractError> {
        let document = Html::parse_document(content);
        let Some(link) = document.select(&self.email_link).next() else {
            return Ok(None);
        };

        let email = non_empty(element_text(link)).or_else(|| {
            link.value()
                .attr("href")
                .and_then(|href| href.strip_prefix("mailto:"))
                .map(|address| address.split('?').next().unwrap_or(address).trim().to_string())
                .filter(|address| !address.is_empty())
        });
        Ok(email)
    }

    /// Address fragments of the map preview, joined with ", "
    fn extract_address(&self, content: &str) -> Result<Option<String>, ExtractError> {
        let document = Html::parse_document(content);
        let Some(section) = document.select(&self.address_section).next() else {
            return Ok(None);
        };

        let parts: Vec<String> = section
            .select(&self.address_parts)
            .map(element_text)
            .filter(|part| !part.is_empty())
            .collect();

        Ok(non_empty(parts.join(", ")))
    }

    /// Page heading, and the rating of the main ratings section only
    fn extract_title_and_rating(
        &self,
        content: &str,
    ) -> Result<(Option<String>, Option<String>), ExtractError> {
        let document = Html::parse_document(content);

        let title = document
            .select(&self.heading)
            .next()
            .map(element_text)
            .and_then(non_empty);

        let rating = document
            .select(&self.ratings_section)
            .next()
            .and_then(|section| section.select(&self.average_rating).next())
            .map(element_text)
            .and_then(non_empty);

        if rating.is_none() {
            tracing::debug!("No main rating section on detail page");
        }

        Ok((title, rating))
    }
}
