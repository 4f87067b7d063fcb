//! Toptal listings scraper. Same rendered-HTML approach as Upwork with
//! Toptal's own selector candidates; the id is the listing slug.

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
    r#"[data-testid="job-card"]"#,
    "article.job-card",
    ".job-listing",
    "li.job",
];

const TITLE_SELECTORS: &[&str] = &[
    r#"[data-testid="job-card-title"] a"#,
    "h3 a",
    "h2 a",
    r#"a[href*="/freelance-jobs/"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[data-testid="job-card-description"]"#,
    ".job-description",
    "p",
];

const RATE_SELECTORS: &[&str] = &[
    r#"[data-testid="job-card-rate"]"#,
    ".job-rate",
    r#"span[class*="rate"]"#,
];

const MAX_CARDS: usize = 20;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ToptalScraper {
    config: SiteConfig,
    skills: Arc<SkillMatcher>,
    browser: Arc<BrowserlessClient>,
}

impl ToptalScraper {
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
}

#[async_trait]
impl JobScraper for ToptalScraper {
    async fn fetch(&self) -> Result<Vec<JobPost>> {
        let request = ContentRequest::new(self.config.url.clone())
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
            info!(source = %self.config.name, jobs = posts.len(), "Toptal fetch complete");
        }
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn platform(&self) -> Platform {
        Platform::Toptal
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

fn id_from_url(url: &str) -> String {
    let no_query = url.split('?').next().unwrap_or(url);
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
            format!("https://www.toptal.com{href}")
        };
        let platform_id = id_from_url(&url);
        if platform_id.is_empty() {
            continue;
        }

        let description = first_text(&card, DESCRIPTION_SELECTORS).unwrap_or_default();
        let budget = first_text(&card, RATE_SELECTORS)
            .as_deref()
            .map(parse_budget)
            .unwrap_or_default();

        posts.push(JobPost {
            platform: Platform::Toptal,
            platform_id,
            title,
            company: None,
            location: None,
            skills: skills.extract(&description),
            budget_min: budget.min,
            budget_max: budget.max,
            budget_type: budget.budget_type,
            client_country: None,
            client_rating: None,
            posted_at: None,
            description,
            url,
        });
    }
    posts
}
