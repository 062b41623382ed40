//! Page session over static documents
//!
//! `HtmlSession` turns any [`DocumentSource`] into a [`PageProvider`]: it keeps
//! the current document and a history stack, evaluates CSS selectors with
//! `scraper`, and implements clicks by following the element's link (its own
//! `href`, or the closest enclosing anchor's).

use crate::page::source::DocumentSource;
use crate::page::{ElementHandle, Locator, PageProvider};
use crate::{PageError, PageResult};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Currently loaded document
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    body: String,
}

/// A [`PageProvider`] backed by fetched HTML documents
pub struct HtmlSession<S> {
    source: S,
    current: Option<LoadedPage>,
    history: Vec<Url>,
}

impl<S: DocumentSource> HtmlSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: None,
            history: Vec::new(),
        }
    }

    /// The underlying document source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of pages on the back stack
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn loaded(&self) -> PageResult<&LoadedPage> {
        self.current.as_ref().ok_or(PageError::NoPage)
    }

    fn resolve_url(&self, target: &str) -> PageResult<Url> {
        let parsed = match &self.current {
            Some(page) => page.url.join(target),
            None => Url::parse(target),
        };
        parsed.map_err(|e| PageError::Navigation {
            url: target.to_string(),
            message: e.to_string(),
        })
    }

    async fn load(&mut self, url: &Url) -> PageResult<LoadedPage> {
        let fetched = self.source.fetch(url).await?;
        Ok(LoadedPage {
            url: fetched.url,
            body: fetched.body,
        })
    }

    /// Re-resolves `element` and returns where clicking it leads
    fn click_target(&self, element: &ElementHandle, allow_data_href: bool) -> PageResult<String> {
        let page = self.loaded()?;
        let document = Html::parse_document(&page.body);
        let resolved = resolve(&document, &element.locator)?
            .ok_or_else(|| PageError::StaleElement(element.locator.to_string()))?;

        if resolved.value().attr("disabled").is_some() {
            return Err(PageError::NotClickable(element.locator.to_string()));
        }

        let target = link_of(resolved).or_else(|| {
            allow_data_href
                .then(|| resolved.value().attr("data-href").map(str::to_string))
                .flatten()
        });

        target.ok_or_else(|| PageError::NotClickable(element.locator.to_string()))
    }
}

#[async_trait]
impl<S: DocumentSource> PageProvider for HtmlSession<S> {
    async fn navigate(&mut self, url: &str) -> PageResult<()> {
        let target = self.resolve_url(url)?;
        let page = self.load(&target).await?;
        if let Some(previous) = self.current.take() {
            self.history.push(previous.url);
        }
        self.current = Some(page);
        Ok(())
    }

    async fn current_url(&mut self) -> PageResult<String> {
        Ok(self.loaded()?.url.to_string())
    }

    async fn current_content(&mut self) -> PageResult<String> {
        Ok(self.loaded()?.body.clone())
    }

    async fn find_all(&mut self, selector: &str) -> PageResult<Vec<ElementHandle>> {
        let page = self.loaded()?;
        let document = Html::parse_document(&page.body);
        let parsed = parse_selector(selector)?;
        Ok(document
            .select(&parsed)
            .enumerate()
            .map(|(index, element)| snapshot(element, Locator::root(selector, index), &page.url))
            .collect())
    }

    async fn find_within(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> PageResult<Vec<ElementHandle>> {
        let page = self.loaded()?;
        let document = Html::parse_document(&page.body);
        let parsed = parse_selector(selector)?;
        let parent_ref = resolve(&document, &parent.locator)?
            .ok_or_else(|| PageError::StaleElement(parent.locator.to_string()))?;
        Ok(parent_ref
            .select(&parsed)
            .enumerate()
            .map(|(index, element)| {
                snapshot(element, parent.locator.child(selector, index), &page.url)
            })
            .collect())
    }

    async fn click(&mut self, element: &ElementHandle) -> PageResult<()> {
        let target = self.click_target(element, false)?;
        self.navigate(&target).await
    }

    async fn script_click(&mut self, element: &ElementHandle) -> PageResult<()> {
        let target = self.click_target(element, true)?;
        self.navigate(&target).await
    }

    async fn back(&mut self) -> PageResult<()> {
        let previous = self.history.pop().ok_or(PageError::NoHistory)?;
        match self.load(&previous).await {
            Ok(page) => {
                self.current = Some(page);
                Ok(())
            }
            Err(err) => {
                self.history.push(previous);
                Err(err)
            }
        }
    }

    async fn reload(&mut self) -> PageResult<()> {
        let url = self.loaded()?.url.clone();
        let page = self.load(&url).await?;
        self.current = Some(page);
        Ok(())
    }
}

fn parse_selector(selector: &str) -> PageResult<Selector> {
    Selector::parse(selector).map_err(|e| PageError::Selector(format!("{}: {:?}", selector, e)))
}

/// Walks a locator from the document root
fn resolve<'a>(document: &'a Html, locator: &Locator) -> PageResult<Option<ElementRef<'a>>> {
    let mut current: Option<ElementRef<'a>> = None;
    for step in locator.steps() {
        let selector = parse_selector(&step.selector)?;
        let next = match current {
            None => document.select(&selector).nth(step.index),
            Some(parent) => parent.select(&selector).nth(step.index),
        };
        match next {
            Some(found) => current = Some(found),
            None => return Ok(None),
        }
    }
    Ok(current)
}

/// Own `href` first, then the closest ancestor's
fn link_of(element: ElementRef<'_>) -> Option<String> {
    if let Some(href) = element.value().attr("href") {
        return Some(href.to_string());
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|ancestor| ancestor.value().attr("href").map(str::to_string))
}

fn snapshot(element: ElementRef<'_>, locator: Locator, base: &Url) -> ElementHandle {
    let text = collapse_whitespace(&element.text().collect::<String>());
    let attributes: BTreeMap<String, String> = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let link = link_of(element).and_then(|href| base.join(&href).ok().map(String::from));

    ElementHandle {
        locator,
        text,
        attributes,
        link,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::source::FetchedDocument;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fixed set of documents keyed by absolute URL
    struct StaticSource {
        pages: HashMap<String, String>,
        fetches: Mutex<Vec<String>>,
    }

    impl StaticSource {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                fetches: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn fetch(&self, url: &Url) -> PageResult<FetchedDocument> {
            self.fetches.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(body) => Ok(FetchedDocument {
                    url: url.clone(),
                    body: body.clone(),
                }),
                None => Err(PageError::Navigation {
                    url: url.to_string(),
                    message: "HTTP 404".to_string(),
                }),
            }
        }
    }

    const LIST: &str = r#"<html><body>
        <article data-testid="list-element-desktop"><a href="/d/1"><h2 data-testid="title">First   Shop</h2></a></article>
        <article data-testid="list-element-desktop"><h2 data-testid="title">No link</h2></article>
        <button id="load-next-page" disabled>Next</button>
    </body></html>"#;

    fn session() -> HtmlSession<StaticSource> {
        HtmlSession::new(StaticSource::new(&[
            ("https://dir.test/list", LIST),
            ("https://dir.test/d/1", "<html><body><h1>First Shop</h1></body></html>"),
        ]))
    }

    #[tokio::test]
    async fn test_find_all_snapshots_text_and_links() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();

        let titles = page.find_all("h2[data-testid='title']").await.unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[0].text, "First Shop");
        assert_eq!(titles[0].link.as_deref(), Some("https://dir.test/d/1"));
        assert!(titles[1].link.is_none());
    }

    #[tokio::test]
    async fn test_find_within_scopes_to_parent() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();

        let cards = page.find_all("article").await.unwrap();
        let inner = page.find_within(&cards[1], "h2").await.unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].text, "No link");
        assert_eq!(inner[0].locator.to_string(), "article[1] >> h2[0]");
    }

    #[tokio::test]
    async fn test_click_follows_enclosing_anchor_and_back_returns() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();

        let titles = page.find_all("h2").await.unwrap();
        page.click(&titles[0]).await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "https://dir.test/d/1");
        assert_eq!(page.history_len(), 1);

        page.back().await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "https://dir.test/list");
        assert_eq!(page.history_len(), 0);
    }

    #[tokio::test]
    async fn test_click_without_link_is_not_clickable() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();

        let titles = page.find_all("h2").await.unwrap();
        assert!(matches!(
            page.click(&titles[1]).await,
            Err(PageError::NotClickable(_))
        ));

        let buttons = page.find_all("button").await.unwrap();
        assert!(matches!(
            page.script_click(&buttons[0]).await,
            Err(PageError::NotClickable(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_handle_after_navigation() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();
        let titles = page.find_all("h2").await.unwrap();

        page.navigate("/d/1").await.unwrap();
        assert!(matches!(
            page.click(&titles[1]).await,
            Err(PageError::StaleElement(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_navigation_keeps_current_page() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();

        assert!(page.navigate("/missing").await.is_err());
        assert_eq!(page.current_url().await.unwrap(), "https://dir.test/list");
        assert!(matches!(page.back().await, Err(PageError::NoHistory)));
    }

    #[tokio::test]
    async fn test_reload_refetches_current_page() {
        let mut page = session();
        page.navigate("https://dir.test/list").await.unwrap();
        page.reload().await.unwrap();

        let fetches = page.source().fetches.lock().unwrap().clone();
        assert_eq!(fetches, vec!["https://dir.test/list", "https://dir.test/list"]);
    }

    #[tokio::test]
    async fn test_no_page_loaded() {
        let mut page = session();
        assert!(matches!(page.current_content().await, Err(PageError::NoPage)));
        assert!(matches!(page.find_all("h1").await, Err(PageError::NoPage)));
    }
}
