//! Document sources for [`HtmlSession`](crate::page::HtmlSession)

use crate::{PageError, PageResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// A fetched document and the address it was finally served from
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: Url,
    pub body: String,
}

/// Something that can produce the HTML of a URL
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> PageResult<FetchedDocument>;
}

/// HTTP document source
///
/// Server errors (5xx) are returned as documents rather than failures, so the
/// recovery guard gets to see crash pages and decide whether to reload.
/// Client errors (4xx) and transport failures are navigation errors.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Builds an HTTP source
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User agent header value
    /// * `timeout` - Upper bound for a whole request
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, url: &Url) -> PageResult<FetchedDocument> {
        let navigation_error = |message: String| PageError::Navigation {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    navigation_error("Request timeout".to_string())
                } else if e.is_connect() {
                    navigation_error("Connection refused".to_string())
                } else {
                    navigation_error(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_client_error() || status == StatusCode::NOT_MODIFIED {
            return Err(navigation_error(format!("HTTP {}", status.as_u16())));
        }
        if status.is_server_error() {
            tracing::debug!("{} answered HTTP {}", url, status.as_u16());
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        Ok(FetchedDocument {
            url: final_url,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_source() {
        let source = HttpSource::new("TestAgent/1.0", Duration::from_secs(5));
        assert!(source.is_ok());
    }
}
