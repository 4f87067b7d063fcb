//! Remotive JSON API scraper (`/api/remote-jobs`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use gigsignal_common::{parse_budget, GigSignalError, JobPost, Platform, SiteConfig, SkillMatcher};

use super::{fetch_text, http_client, parse_datetime, JobScraper};

#[derive(Deserialize)]
struct RemotiveResponse {
    #[serde(default)]
    jobs: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RemotiveJob {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    candidate_required_location: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    salary: Option<String>,
}

pub struct RemotiveScraper {
    config: SiteConfig,
    skills: Arc<SkillMatcher>,
    client: reqwest::Client,
}

impl RemotiveScraper {
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
impl JobScraper for RemotiveScraper {
    async fn fetch(&self) -> Result<Vec<JobPost>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(search) = &self.config.search_query {
            query.push(("search", search));
        }
        let body = fetch_text(&self.client, &self.config.url, &query).await?;
        let posts = parse_jobs(&body, &self.skills)?;
        info!(source = %self.config.name, jobs = posts.len(), "Remotive fetch complete");
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn platform(&self) -> Platform {
        Platform::Remotive
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

/// Decode the response body. Individual records that don't match the
/// expected shape are skipped; the source keeps going.
fn parse_jobs(body: &str, skills: &SkillMatcher) -> Result<Vec<JobPost>> {
    let response: RemotiveResponse = serde_json::from_str(body)?;
    let mut posts = Vec::new();
    for value in response.jobs {
        let job: RemotiveJob = match serde_json::from_value(value) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Skipping malformed Remotive record");
                continue;
            }
        };
        let budget = job
            .salary
            .as_deref()
            .map(parse_budget)
            .unwrap_or_default();
        let location = match job.candidate_required_location.as_str() {
            "" => Some("Worldwide".to_string()),
            other => Some(other.to_string()),
        };
        posts.push(JobPost {
            platform: Platform::Remotive,
            platform_id: job.id.to_string(),
            title: job.title,
            company: Some(job.company_name).filter(|c| !c.is_empty()),
            location,
            skills: skills.extract(&job.description),
            budget_min: budget.min,
            budget_max: budget.max,
            budget_type: budget.budget_type,
            client_country: None,
            client_rating: None,
            posted_at: job.publication_date.as_deref().and_then(parse_datetime),
            description: job.description,
            url: job.url,
        });
    }
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gigsignal_common::BudgetType;

    const FIXTURE: &str = r#"{
        "job-count": 2,
        "jobs": [
            {
                "id": 1910712,
                "url": "https://remotive.com/remote-jobs/software-dev/senior-java-developer-1910712",
                "title": "Senior Java Developer",
                "company_name": "Acme Corp",
                "candidate_required_location": "USA Only",
                "publication_date": "2026-07-20T10:30:00",
                "salary": "$120k-150k",
                "description": "We build Java and PostgreSQL services on AWS."
            },
            {
                "id": "not-a-number",
                "title": "Broken record"
            },
            {
                "id": 1910713,
                "url": "https://remotive.com/remote-jobs/software-dev/rust-engineer-1910713",
                "title": "Rust Engineer",
                "company_name": "",
                "candidate_required_location": "",
                "description": "Rust, Docker and Kubernetes."
            }
        ]
    }"#;

    #[test]
    fn parses_fixture_and_skips_malformed_records() {
        let skills = SkillMatcher::default_vocabulary();
        let posts = parse_jobs(FIXTURE, &skills).unwrap();
        assert_eq!(posts.len(), 2);

        let first = &posts[0];
        assert_eq!(first.platform_id, "1910712");
        assert_eq!(first.natural_key(), "remotive_1910712");
        assert_eq!(first.company.as_deref(), Some("Acme Corp"));
        assert_eq!(first.budget_min, Some(120_000.0));
        assert_eq!(first.budget_max, Some(150_000.0));
        assert_eq!(first.budget_type, BudgetType::Fixed);
        assert!(first.posted_at.is_some());
        assert!(first.skills.contains(&"Java".to_string()));
        assert!(first.skills.contains(&"PostgreSQL".to_string()));

        let second = &posts[1];
        assert_eq!(second.company, None);
        assert_eq!(second.location.as_deref(), Some("Worldwide"));
        assert_eq!(second.budget_type, BudgetType::Unknown);
    }

    #[test]
    fn empty_jobs_array_is_fine() {
        let skills = SkillMatcher::default_vocabulary();
        let posts = parse_jobs(r#"{"jobs": []}"#, &skills).unwrap();
        assert!(posts.is_empty());
    }
}
