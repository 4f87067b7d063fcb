//! RemoteOK JSON API scraper. The endpoint returns a bare array whose
//! first element is an API/legal notice, not a job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, warn};

use gigsignal_common::{
    parse_budget, BudgetType, GigSignalError, JobPost, Platform, SiteConfig, SkillMatcher,
};

use super::{fetch_text, http_client, JobScraper};

#[derive(Deserialize)]
struct RemoteOkJob {
    id: serde_json::Value,
    #[serde(default)]
    position: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    epoch: Option<i64>,
    #[serde(default)]
    salary_min: Option<f64>,
    #[serde(default)]
    salary_max: Option<f64>,
    #[serde(default)]
    salary: Option<String>,
}

pub struct RemoteOkScraper {
    config: SiteConfig,
    skills: Arc<SkillMatcher>,
    client: reqwest::Client,
}

impl RemoteOkScraper {
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
impl JobScraper for RemoteOkScraper {
    async fn fetch(&self) -> Result<Vec<JobPost>> {
        let body = fetch_text(&self.client, &self.config.url, &[]).await?;
        let posts = parse_jobs(&body, &self.skills)?;
        info!(source = %self.config.name, jobs = posts.len(), "RemoteOK fetch complete");
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn platform(&self) -> Platform {
        Platform::Remoteok
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

/// The id arrives as either a number or a string depending on the feed.
fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn parse_jobs(body: &str, skills: &SkillMatcher) -> Result<Vec<JobPost>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let mut posts = Vec::new();

    // Skip the metadata element by shape, not just position: anything
    // without an id is not a job.
    for value in values {
        if value.get("id").is_none() {
            continue;
        }
        let job: RemoteOkJob = match serde_json::from_value(value) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Skipping malformed RemoteOK record");
                continue;
            }
        };
        let Some(id) = id_string(&job.id) else {
            continue;
        };

        let (budget_min, budget_max, budget_type) = match (job.salary_min, job.salary_max) {
            (None, None) => {
                let parsed = job.salary.as_deref().map(parse_budget).unwrap_or_default();
                (parsed.min, parsed.max, parsed.budget_type)
            }
            (min, max) => (min.or(max), max.or(min), BudgetType::Fixed),
        };

        posts.push(JobPost {
            platform: Platform::Remoteok,
            platform_id: id.clone(),
            title: job.position,
            company: Some(job.company).filter(|c| !c.is_empty()),
            location: match job.location.as_str() {
                "" => Some("Remote".to_string()),
                other => Some(other.to_string()),
            },
            skills: skills.extract(&job.description),
            budget_min,
            budget_max,
            budget_type,
            client_country: None,
            client_rating: None,
            posted_at: job
                .epoch
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            description: job.description,
            url: format!("https://remoteok.com/remote-jobs/{id}"),
        });
    }
    Ok(posts)
}
