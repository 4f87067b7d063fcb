//! Arbeitnow job-board API scraper (`/api/job-board-api`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, warn};

use gigsignal_common::{GigSignalError, JobPost, Platform, SiteConfig, SkillMatcher};

use super::{fetch_text, http_client, JobScraper};

#[derive(Deserialize)]
struct ArbeitnowResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ArbeitnowJob {
    slug: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    remote: Option<bool>,
    #[serde(default)]
    created_at: Option<i64>,
}

pub struct ArbeitnowScraper {
    config: SiteConfig,
    skills: Arc<SkillMatcher>,
    client: reqwest::Client,
}

impl ArbeitnowScraper {
    pub fn new(config: SiteConfig, skills: Arc<SkillMatcher>) -> Result<Self, GigSignalError> {
        let client = http_client(&config)?;
        Ok(Self {
            config,
            skills,
            client,
        })
    }
}

#[async_trait]
impl JobScraper for ArbeitnowScraper {
    async fn fetch(&self) -> Result<Vec<JobPost>> {
        let body = fetch_text(&self.client, &self.config.url, &[]).await?;
        let posts = parse_jobs(&body, &self.skills)?;
        info!(source = %self.config.name, jobs = posts.len(), "Arbeitnow fetch complete");
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn platform(&self) -> Platform {
        Platform::Arbeitnow
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

fn parse_jobs(body: &str, skills: &SkillMatcher) -> Result<Vec<JobPost>> {
    let response: ArbeitnowResponse = serde_json::from_str(body)?;
    let mut posts = Vec::new();
    for value in response.data {
        let job: ArbeitnowJob = match serde_json::from_value(value) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Skipping malformed Arbeitnow record");
                continue;
            }
        };
        let location = if job.location.is_empty() {
            if job.remote == Some(true) {
                Some("Remote".to_string())
            } else {
                None
            }
        } else {
            Some(job.location)
        };
        posts.push(JobPost {
            platform: Platform::Arbeitnow,
            platform_id: job.slug,
            title: job.title,
            company: Some(job.company_name).filter(|c| !c.is_empty()),
            location,
            skills: skills.extract(&job.description),
            budget_min: None,
            budget_max: None,
            budget_type: Default::default(),
            client_country: None,
            client_rating: None,
            posted_at: job
                .created_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            description: job.description,
            url: job.url,
        });
    }
    Ok(posts)
}
