//! In-memory site fixtures for unit tests

use crate::config::{Config, DelayConfig, TimeoutConfig};
use crate::page::{DocumentSource, FetchedDocument};
use crate::{PageError, PageResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, VecDeque<String>>,
    fetches: Vec<String>,
}

/// A site whose pages are registered by path
///
/// A path registered with several bodies serves them in order and then keeps
/// serving the last one.
#[derive(Clone)]
pub struct FakeSite {
    base: String,
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            state: Arc::default(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn page(&self, path: &str, body: &str) {
        self.pages(path, &[body]);
    }

    pub fn pages(&self, path: &str, bodies: &[&str]) {
        let bodies = bodies.iter().map(|b| b.to_string()).collect();
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(self.url(path), bodies);
    }

    pub fn remove(&self, path: &str) {
        self.state.lock().unwrap().pages.remove(&self.url(path));
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        let url = self.url(path);
        self.state
            .lock()
            .unwrap()
            .fetches
            .iter()
            .filter(|fetched| **fetched == url)
            .count()
    }
}

#[async_trait]
impl DocumentSource for FakeSite {
    async fn fetch(&self, url: &Url) -> PageResult<FetchedDocument> {
        let mut state = self.state.lock().unwrap();
        state.fetches.push(url.to_string());
        let body = match state.pages.get_mut(url.as_str()) {
            Some(bodies) if bodies.len() > 1 => bodies.pop_front(),
            Some(bodies) => bodies.front().cloned(),
            None => None,
        };
        body.map(|body| FetchedDocument {
            url: url.clone(),
            body,
        })
        .ok_or_else(|| PageError::Navigation {
            url: url.to_string(),
            message: "HTTP 404".to_string(),
        })
    }
}

/// Configuration pointed at `https://dir.test` with no delays and short waits
pub fn quick_config() -> Config {
    let mut config = Config::default();
    config.site.base_url = "https://dir.test".to_string();
    config.timeouts = TimeoutConfig {
        page_load: 50,
        element: 50,
        detail: 50,
        heading_change: 50,
        poll: 5,
    };
    config.delays = DelayConfig::none();
    config.recovery.settle = 0;
    config
}
