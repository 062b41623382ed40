//! Page provider boundary
//!
//! The crawler never talks to a browser or HTTP client directly. It drives a
//! [`PageProvider`]: one exclusive, serial page session exposing navigation,
//! content snapshots, element lookup and click/scroll primitives.
//!
//! Element handles are snapshots. Each one carries the [`Locator`] it was found
//! with (a chain of selector + position) and providers re-resolve that locator
//! on every interaction, so a handle never outlives a navigation silently: if
//! the position no longer exists the provider answers `PageError::StaleElement`.

mod session;
mod source;

pub use session::HtmlSession;
pub use source::{DocumentSource, FetchedDocument, HttpSource};

use crate::{PageError, PageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// One step of a locator: the `index`-th match of `selector`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorStep {
    pub selector: String,
    pub index: usize,
}

/// Position-based path to an element, re-resolved on every use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    steps: Vec<LocatorStep>,
}

impl Locator {
    /// The `index`-th match of `selector` in the whole document
    pub fn root(selector: &str, index: usize) -> Self {
        Self {
            steps: vec![LocatorStep {
                selector: selector.to_string(),
                index,
            }],
        }
    }

    /// The `index`-th match of `selector` inside the element this locator points at
    pub fn child(&self, selector: &str, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(LocatorStep {
            selector: selector.to_string(),
            index,
        });
        Self { steps }
    }

    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " >> ")?;
            }
            write!(f, "{}[{}]", step.selector, step.index)?;
        }
        Ok(())
    }
}

/// Snapshot of an element at lookup time
#[derive(Debug, Clone)]
pub struct ElementHandle {
    /// How to find this element again
    pub locator: Locator,

    /// Visible text, whitespace collapsed
    pub text: String,

    /// Element attributes
    pub attributes: BTreeMap<String, String>,

    /// Absolute target of the element or its closest enclosing link
    pub link: Option<String>,
}

impl ElementHandle {
    /// Attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Conditions a provider can wait for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one element matches the selector
    Present(String),

    /// The first match of the selector has text different from `from`
    TextChanged { selector: String, from: String },

    /// Some match of the selector has exactly `text` (trimmed)
    WithText { selector: String, text: String },
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(selector) => write!(f, "presence of {}", selector),
            Self::TextChanged { selector, .. } => write!(f, "text change of {}", selector),
            Self::WithText { selector, text } => write!(f, "{} with text '{}'", selector, text),
        }
    }
}

/// A serial page session
///
/// Implementations represent one exclusive rendering session. Every method may
/// take time; callers bound their waits through [`PageProvider::wait_until`].
#[async_trait]
pub trait PageProvider: Send {
    /// Loads `url`, resolved against the current page when relative
    async fn navigate(&mut self, url: &str) -> PageResult<()>;

    /// Address of the current page
    async fn current_url(&mut self) -> PageResult<String>;

    /// Rendered content of the current page
    async fn current_content(&mut self) -> PageResult<String>;

    /// All elements matching `selector`, in document order
    async fn find_all(&mut self, selector: &str) -> PageResult<Vec<ElementHandle>>;

    /// All elements matching `selector` inside `parent`
    async fn find_within(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> PageResult<Vec<ElementHandle>>;

    /// Regular user click
    async fn click(&mut self, element: &ElementHandle) -> PageResult<()>;

    /// Script-dispatched click, used when a regular click is intercepted
    async fn script_click(&mut self, element: &ElementHandle) -> PageResult<()>;

    /// History back
    async fn back(&mut self) -> PageResult<()>;

    /// Reloads the current page
    async fn reload(&mut self) -> PageResult<()>;

    /// Scrolls by a fraction of the viewport height
    async fn scroll_by(&mut self, _viewport_fraction: f32) -> PageResult<()> {
        Ok(())
    }

    /// Scrolls `element` to the middle of the viewport
    async fn scroll_into_view(&mut self, _element: &ElementHandle) -> PageResult<()> {
        Ok(())
    }

    /// Hides popups and modal overlays that would intercept clicks
    async fn dismiss_overlays(&mut self) -> PageResult<()> {
        Ok(())
    }

    /// Polls `condition` every `poll` until it holds or `timeout` elapses
    ///
    /// Returns `Ok(false)` on timeout; only provider failures are errors.
    async fn wait_until(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
        poll: Duration,
    ) -> PageResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if condition_holds(self, condition).await? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }
}

async fn condition_holds<P: PageProvider + ?Sized>(
    page: &mut P,
    condition: &WaitCondition,
) -> PageResult<bool> {
    match condition {
        WaitCondition::Present(selector) => Ok(!page.find_all(selector).await?.is_empty()),
        WaitCondition::TextChanged { selector, from } => {
            Ok(match first_text(page, selector).await? {
                Some(text) => text != *from,
                None => false,
            })
        }
        WaitCondition::WithText { selector, text } => Ok(page
            .find_all(selector)
            .await?
            .iter()
            .any(|element| element.text.trim() == text)),
    }
}

/// Text of the first element matching `selector`, if any
pub async fn first_text<P: PageProvider + ?Sized>(
    page: &mut P,
    selector: &str,
) -> PageResult<Option<String>> {
    Ok(page
        .find_all(selector)
        .await?
        .into_iter()
        .next()
        .map(|element| element.text.trim().to_string()))
}

/// Clicks `element`, falling back to a script click
///
/// Fails only when both strategies fail, with the script click's error.
pub async fn click_safely<P: PageProvider + ?Sized>(
    page: &mut P,
    element: &ElementHandle,
) -> PageResult<()> {
    match page.click(element).await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!("Click on {} failed ({}), trying script click", element.locator, err);
            page.script_click(element).await
        }
    }
}

/// Waits for `condition`, logging instead of failing when it never holds
pub async fn wait_tolerant<P: PageProvider + ?Sized>(
    page: &mut P,
    condition: WaitCondition,
    timeout: Duration,
    poll: Duration,
) -> bool {
    match page.wait_until(&condition, timeout, poll).await {
        Ok(true) => true,
        Ok(false) => {
            tracing::debug!(
                "{}",
                PageError::Timeout {
                    condition: condition.to_string(),
                    millis: timeout.as_millis() as u64,
                }
            );
            false
        }
        Err(err) => {
            tracing::debug!("Waiting for {} failed: {}", condition, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        let locator = Locator::root("article", 2).child("h2", 0);
        assert_eq!(locator.to_string(), "article[2] >> h2[0]");
        assert_eq!(locator.steps().len(), 2);
    }

    #[test]
    fn test_locator_child_does_not_mutate_parent() {
        let parent = Locator::root("article", 0);
        let _child = parent.child("h2", 1);
        assert_eq!(parent.steps().len(), 1);
    }

    #[test]
    fn test_wait_condition_display() {
        let cond = WaitCondition::Present("h1".to_string());
        assert_eq!(cond.to_string(), "presence of h1");
    }
}
