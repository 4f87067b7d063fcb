//! Upwork search-results scraper. The page is JS-rendered, so the HTML
//! comes from a browserless /content call; field extraction then walks a
//! ranked list of CSS selectors per field, first hit wins. Selector rot
//! degrades this source to empty rather than failing the tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{info, warn};

use browserless_client::{BrowserlessClient, BrowserlessError, ContentRequest};
use gigsignal_common::{parse_budget, JobPost, Platform, SiteConfig, SkillMatcher};

use super::{first_link, first_text, JobScraper};

const CONTAINER_SELECTORS: &[&str] = &[
    r#"[data-test="job-tile"]"#,
    r#"article[data-test="JobTile"]"#,
    ".job-tile",
    "section.air3-card",
];

const TITLE_SELECTORS: &[&str] = &[
    r#"[data-test="job-title-link"]"#,
    "h2 a",
    ".job-title a",
    r#"a[href*="/jobs/"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[data-test="job-description-text"]"#,
    ".job-description",
    r#"p[data-test="UpCLineClamp"]"#,
];

const BUDGET_SELECTORS: &[&str] = &[
    r#"[data-test="job-type-label"]"#,
    r#"[data-test="is-fixed-price"]"#,
    r#"strong[data-test*="budget"]"#,
];

const COUNTRY_SELECTORS: &[&str] = &[
    r#"[data-test="client-country"]"#,
    r#"small[data-test="location"]"#,
];

/// Cards beyond this are below the fold and mostly stale reposts.
const MAX_CARDS: usize = 20;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

pub struct UpworkScraper {
    config: SiteConfig,
    skills: Arc<SkillMatcher>,
    browser: Arc<BrowserlessClient>,
}

impl UpworkScraper {
    pub fn new(
        config: SiteConfig,
        skills: Arc<SkillMatcher>,
        browser: Arc<BrowserlessClient>,
    ) -> Self {
        Self {
            config,
            skills,
            browser,
        }
    }

    fn search_url(&self) -> String {
        match &self.config.search_query {
            Some(query) => {
                let q = query.replace(' ', "+");
                format!("{}?q={q}", self.config.url.trim_end_matches('?'))
            }
            None => self.config.url.clone(),
        }
    }
}

#[async_trait]
impl JobScraper for UpworkScraper {
    async fn fetch(&self) -> Result<Vec<JobPost>> {
        let request = ContentRequest::new(self.search_url())
            .goto_timeout(RENDER_TIMEOUT)
            .wait_for(CONTAINER_SELECTORS[0], WAIT_TIMEOUT);
        let html = match self.browser.content(&request).await {
            Ok(html) => html,
            Err(BrowserlessError::SelectorTimeout { selector, .. }) => {
                warn!(source = %self.config.name, selector = %selector, "Container selector never appeared");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).context("browserless render failed"),
        };
        let posts = parse_cards(&html, &self.skills);
        if posts.is_empty() {
            warn!(source = %self.config.name, "No job cards found; selectors may have rotted");
        } else {
            info!(source = %self.config.name, jobs = posts.len(), "Upwork fetch complete");
        }
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn platform(&self) -> Platform {
        Platform::Upwork
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

/// Upwork job URLs end in `~<id>`; older layouts use the last path
/// segment instead.
fn id_from_url(url: &str) -> String {
    let no_query = url.split('?').next().unwrap_or(url);
    if let Some(idx) = no_query.rfind('~') {
        return no_query[idx + 1..].to_string();
    }
    no_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(no_query)
        .to_string()
}

pub(crate) fn parse_cards(html: &str, skills: &SkillMatcher) -> Vec<JobPost> {
    let document = Html::parse_document(html);

    let mut cards = Vec::new();
    for raw in CONTAINER_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        cards = document.select(&selector).collect();
        if !cards.is_empty() {
            break;
        }
    }

    let mut posts = Vec::new();
    for card in cards.into_iter().take(MAX_CARDS) {
        let Some((title, href)) = first_link(&card, TITLE_SELECTORS) else {
            continue;
        };
        let url = if href.starts_with("http") {
            href
        } else {
            format!("https://www.upwork.com{href}")
        };
        let platform_id = id_from_url(&url);
        if platform_id.is_empty() {
            continue;
        }

        let description = first_text(&card, DESCRIPTION_SELECTORS).unwrap_or_default();
        let budget = first_text(&card, BUDGET_SELECTORS)
            .as_deref()
            .map(parse_budget)
            .unwrap_or_default();
        let client_country = first_text(&card, COUNTRY_SELECTORS);

        posts.push(JobPost {
            platform: Platform::Upwork,
            platform_id,
            title,
            company: None,
            location: client_country.clone(),
            skills: skills.extract(&description),
            budget_min: budget.min,
            budget_max: budget.max,
            budget_type: budget.budget_type,
            client_country,
            client_rating: None,
            posted_at: None,
            description,
            url,
        });
    }
    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use gigsignal_common::BudgetType;

    const FIXTURE: &str = r#"
    <html><body>
      <section>
        <div data-test="job-tile">
          <h2><a data-test="job-title-link" href="/jobs/Senior-Java-backend_~021234567890abcdef?source=search">
            Senior Java backend work
          </a></h2>
          <p data-test="job-description-text">Maintain Java and SQL services for a trading desk.</p>
          <strong data-test="job-type-label">Hourly: $60-$90</strong>
          <small data-test="location">United States</small>
        </div>
        <div data-test="job-tile">
          <h2><a href="https://www.upwork.com/jobs/quick-fix_~02fedcba">Quick CSS fix</a></h2>
          <strong data-test="is-fixed-price">Fixed-price - $150</strong>
        </div>
        <div data-test="job-tile">
          <span>Card with no title link is skipped</span>
        </div>
      </section>
    </body></html>
    "#;

    #[test]
    fn parses_cards_with_ranked_selectors() {
        let skills = SkillMatcher::default_vocabulary();
        let posts = parse_cards(FIXTURE, &skills);
        assert_eq!(posts.len(), 2);

        let first = &posts[0];
        assert_eq!(first.natural_key(), "upwork_021234567890abcdef");
        assert_eq!(first.title, "Senior Java backend work");
        assert!(first.url.starts_with("https://www.upwork.com/jobs/"));
        assert_eq!(first.budget_type, BudgetType::Hourly);
        assert_eq!(first.budget_min, Some(60.0));
        assert_eq!(first.budget_max, Some(90.0));
        assert_eq!(first.client_country.as_deref(), Some("United States"));
        assert!(first.skills.contains(&"Java".to_string()));

        let second = &posts[1];
        assert_eq!(second.platform_id, "02fedcba");
        assert_eq!(second.budget_type, BudgetType::Fixed);
        assert_eq!(second.budget_min, Some(150.0));
        assert!(second.description.is_empty());
    }

    #[test]
    fn selector_misses_yield_empty_not_error() {
        let skills = SkillMatcher::default_vocabulary();
        assert!(parse_cards("<html><body><p>nothing here</p></body></html>", &skills).is_empty());
    }

    #[test]
    fn id_extraction_handles_both_url_shapes() {
        assert_eq!(
            id_from_url("https://www.upwork.com/jobs/x_~02abc?source=s"),
            "02abc"
        );
        assert_eq!(
            id_from_url("https://www.upwork.com/jobs/plain-slug"),
            "plain-slug"
        );
    }
}
