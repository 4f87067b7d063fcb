//! Source scraper framework: the `JobScraper` contract, the closed-set
//! registry, and shared fetch/parse helpers.

pub mod arbeitnow;
pub mod remoteok;
pub mod remotive;
pub mod toptal;
pub mod upwork;
pub mod wwr;

pub use arbeitnow::ArbeitnowScraper;
pub use remoteok::RemoteOkScraper;
pub use remotive::RemotiveScraper;
pub use toptal::ToptalScraper;
pub use upwork::UpworkScraper;
pub use wwr::WwrScraper;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use scraper::ElementRef;

use browserless_client::BrowserlessClient;
use gigsignal_common::{
    GigSignalError, JobPost, Platform, SiteConfig, SkillMatcher, SourceKind,
};

/// Browser-like UA for sources that reject default client strings.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A scraper fetches one source and returns validated, normalized posts.
/// Errors are allowed out of `fetch` — the orchestrator logs them and
/// treats the source as empty for the tick (fail-soft).
#[async_trait]
pub trait JobScraper: Send + Sync {
    async fn fetch(&self) -> Result<Vec<JobPost>>;

    fn name(&self) -> &str;

    fn platform(&self) -> Platform;

    /// Hard cap the orchestrator applies around `fetch`.
    fn timeout(&self) -> Duration {
        Duration::from_secs(15)
    }
}

/// Build the scraper set for all enabled sites. Unknown kinds never get
/// here (the config enum rejects them at parse); an HTML site without a
/// browserless client is the remaining misconfiguration and is fatal.
pub fn build_scrapers(
    sites: &[SiteConfig],
    skills: Arc<SkillMatcher>,
    browser: Option<Arc<BrowserlessClient>>,
) -> Result<Vec<Box<dyn JobScraper>>, GigSignalError> {
    let mut scrapers: Vec<Box<dyn JobScraper>> = Vec::new();
    for site in sites.iter().filter(|s| s.enabled) {
        let scraper: Box<dyn JobScraper> = match site.kind {
            SourceKind::Remotive => {
                Box::new(RemotiveScraper::new(site.clone(), skills.clone())?)
            }
            SourceKind::Remoteok => {
                Box::new(RemoteOkScraper::new(site.clone(), skills.clone())?)
            }
            SourceKind::Arbeitnow => {
                Box::new(ArbeitnowScraper::new(site.clone(), skills.clone())?)
            }
            SourceKind::Wwr => Box::new(WwrScraper::new(site.clone(), skills.clone())?),
            SourceKind::Upwork => {
                let browser = require_browser(site, &browser)?;
                Box::new(UpworkScraper::new(site.clone(), skills.clone(), browser))
            }
            SourceKind::Toptal => {
                let browser = require_browser(site, &browser)?;
                Box::new(ToptalScraper::new(site.clone(), skills.clone(), browser))
            }
        };
        scrapers.push(scraper);
    }
    Ok(scrapers)
}

fn require_browser(
    site: &SiteConfig,
    browser: &Option<Arc<BrowserlessClient>>,
) -> Result<Arc<BrowserlessClient>, GigSignalError> {
    browser.clone().ok_or_else(|| {
        GigSignalError::Config(format!(
            "site {:?} is an HTML source and needs BROWSERLESS_URL",
            site.name
        ))
    })
}

/// Build the HTTP client for a JSON/RSS source: per-site timeout and any
/// configured headers on every request.
pub(crate) fn http_client(site: &SiteConfig) -> Result<reqwest::Client, GigSignalError> {
    let mut headers = HeaderMap::new();
    if let Some(configured) = &site.headers {
        for (name, value) in configured {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GigSignalError::Config(format!("site {:?}: bad header name {name:?}: {e}", site.name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                GigSignalError::Config(format!("site {:?}: bad header value: {e}", site.name))
            })?;
            headers.insert(name, value);
        }
    }
    if !headers.contains_key(USER_AGENT) {
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    }

    reqwest::Client::builder()
        .timeout(Duration::from_secs(site.timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| GigSignalError::Config(format!("site {:?}: {e}", site.name)))
}

/// GET a source endpoint and return the body, failing on non-2xx.
pub(crate) async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("{url} returned HTTP {status}");
    }
    response.text().await.context("failed to read response body")
}

/// Parse the timestamp formats the sources actually emit: RFC 3339,
/// naive datetimes, bare dates, and RFC 2822 (RSS pubDate).
pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// First non-empty text among a ranked list of selectors.
pub(crate) fn first_text(card: &ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = scraper::Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = card.select(&selector).next() {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First matching element's text and href among a ranked selector list.
pub(crate) fn first_link(card: &ElementRef<'_>, selectors: &[&str]) -> Option<(String, String)> {
    for raw in selectors {
        let Ok(selector) = scraper::Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = card.select(&selector).next() {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() && !href.is_empty() {
                return Some((text, href.to_string()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_timestamp_formats() {
        assert!(parse_datetime("2026-07-01T09:30:00+00:00").is_some());
        assert!(parse_datetime("2026-07-01T09:30:00").is_some());
        assert!(parse_datetime("2026-07-01").is_some());
        assert!(parse_datetime("Wed, 01 Jul 2026 09:30:00 GMT").is_some());
        assert!(parse_datetime("3 days ago").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn ranked_selectors_take_first_hit() {
        let html = scraper::Html::parse_fragment(
            r#"<div class="card"><h2><a href="/jobs/1">Fallback title</a></h2></div>"#,
        );
        let root_sel = scraper::Selector::parse(".card").unwrap();
        let card = html.select(&root_sel).next().unwrap();

        let (text, href) = first_link(&card, &["[data-test=\"job-title-link\"]", "h2 a"]).unwrap();
        assert_eq!(text, "Fallback title");
        assert_eq!(href, "/jobs/1");

        assert!(first_text(&card, &["[data-test=\"missing\"]"]).is_none());
    }
}
