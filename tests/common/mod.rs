//! Mock directory site shared by the integration tests

#![allow(dead_code)]

use directory_harvest::backup::BackupScheduler;
use directory_harvest::config::{Config, DelayConfig, TimeoutConfig};
use directory_harvest::extract::{DetailExtractor, HtmlDetailExtractor};
use directory_harvest::{DatasetStore, HtmlSession, HttpSource, Walker};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CRASH_PAGE: &str = "<html><body><h2>Application error: a client-side exception has occurred</h2></body></html>";

pub type TestWalker = Walker<HtmlSession<HttpSource>, HtmlDetailExtractor>;

/// Configuration pointed at the mock server with no delays and short waits
pub fn test_config(base_url: &str, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.locales = vec!["en".to_string()];
    config.timeouts = TimeoutConfig {
        page_load: 50,
        element: 50,
        detail: 50,
        heading_change: 50,
        poll: 5,
    };
    config.delays = DelayConfig::none();
    config.recovery.settle = 0;
    config.output.data_dir = data_dir.to_path_buf();
    config.output.file_prefix = "harvest".to_string();
    config.backup.interval_secs = 3600;
    config
}

pub fn build_walker(config: &Config) -> TestWalker {
    let extractor = HtmlDetailExtractor::new(&config.selectors).unwrap();
    build_walker_with(config, extractor)
}

/// Same as `build_walker` with a caller-supplied extractor
pub fn build_walker_with<X: DetailExtractor>(
    config: &Config,
    extractor: X,
) -> Walker<HtmlSession<HttpSource>, X> {
    let source = HttpSource::new("HarvestTest/1.0", Duration::from_secs(5)).unwrap();
    let store = DatasetStore::from_config(&config.output);
    let backups = BackupScheduler::new(config.output.backup_root(), config.backup.interval());
    Walker::new(config, HtmlSession::new(source), extractor, store, backups).unwrap()
}

pub async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves `CRASH_PAGE` with HTTP 500 for the first `times` requests of `route`
pub async fn serve_crash(server: &MockServer, route: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500).set_body_string(CRASH_PAGE))
        .up_to_n_times(times)
        .with_priority(1)
        .mount(server)
        .await;
}

pub fn index_page(letters: &[&str]) -> String {
    let links: String = letters
        .iter()
        .map(|l| format!(r#"<a href="/en/categories/{}">{}</a>"#, l.to_lowercase(), l))
        .collect();
    format!(
        "<html><body><h2>Categories from A-Z</h2><div>{}</div></body></html>",
        links
    )
}

pub fn letter_page(categories: &[(&str, &str)]) -> String {
    let links: String = categories
        .iter()
        .map(|(name, href)| format!(r#"<a href="{}">{}</a>"#, href, name))
        .collect();
    format!(
        r#"<html><body><div class="c12">{}</div></body></html>"#,
        links
    )
}

pub fn category_page(heading: &str, sub_letters: &[&str]) -> String {
    let links: String = sub_letters
        .iter()
        .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l.to_uppercase()))
        .collect();
    format!(
        r#"<html><body>
        <button aria-label="current language">EN</button>
        <h1>{}</h1>
        <nav>{}</nav>
        </body></html>"#,
        heading, links
    )
}

pub fn cities_page(cities: &[(&str, &str)]) -> String {
    let links: String = cities
        .iter()
        .map(|(text, href)| format!(r#"<a href="{}">{}</a>"#, href, text))
        .collect();
    format!("<html><body>{}</body></html>", links)
}

/// Result page with one listing per `(title, detail href)` and an optional next page
pub fn list_page(listings: &[(&str, &str)], next: Option<&str>) -> String {
    let articles: String = listings
        .iter()
        .map(|(title, href)| {
            format!(
                r#"<article data-testid="list-element-desktop"><a href="{}"><h2 data-testid="title">{}</h2></a></article>"#,
                href, title
            )
        })
        .collect();
    let next = next
        .map(|href| {
            format!(
                r#"<a href="{}"><button id="load-next-page">Next</button></a>"#,
                href
            )
        })
        .unwrap_or_default();
    format!("<html><body>{}{}</body></html>", articles, next)
}

pub fn detail_page(title: &str, email: Option<&str>) -> String {
    let contact = email
        .map(|email| {
            format!(
                r#"<a data-testid="contact-link" href="mailto:{0}">{0}</a>"#,
                email
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <h1>{}</h1>
        <div data-testid="ratings-section"><span data-testid="average-rating">4.5</span></div>
        <div data-cy="detail-map-preview"><span>Marktgasse 1</span><span>3011 Bern</span></div>
        {}
        </body></html>"#,
        title, contact
    )
}

/// Mounts index letter B with the single category "Bakeries" and sub-letter b
/// listing Bern and Biel; the city pages are left to each test
pub async fn mount_bakeries(server: &MockServer) {
    serve(server, "/en/categories", index_page(&["B"])).await;
    serve(
        server,
        "/en/categories/b",
        letter_page(&[("Bakeries", "/en/categories/b/bakeries")]),
    )
    .await;
    serve(
        server,
        "/en/categories/b/bakeries",
        category_page("Top cities for Bakeries in", &["b"]),
    )
    .await;
    serve(
        server,
        "/en/categories/b/bakeries/b",
        cities_page(&[
            ("Bakeries in Bern", "/en/bakeries/bern"),
            ("Bakeries in Biel", "/en/bakeries/biel"),
        ]),
    )
    .await;
}
