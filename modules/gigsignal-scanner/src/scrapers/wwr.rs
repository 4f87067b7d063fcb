//! We Work Remotely RSS scraper. The feed has no native job ids, so the
//! entry link doubles as the platform id.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use gigsignal_common::{GigSignalError, JobPost, Platform, SiteConfig, SkillMatcher};

use super::{http_client, JobScraper};

pub struct WwrScraper {
    config: SiteConfig,
    skills: Arc<SkillMatcher>,
    client: reqwest::Client,
}

impl WwrScraper {
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
impl JobScraper for WwrScraper {
    async fn fetch(&self) -> Result<Vec<JobPost>> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .context("RSS feed fetch failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned HTTP {status}", self.config.url);
        }
        let bytes = response.bytes().await.context("failed to read RSS body")?;
        let posts = parse_feed(&bytes, &self.skills)?;
        info!(source = %self.config.name, jobs = posts.len(), "WWR feed parsed");
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn platform(&self) -> Platform {
        Platform::Wwr
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

/// WWR titles come as "Company: Job Title"; split when the pattern holds.
fn split_title(raw: &str) -> (Option<String>, String) {
    match raw.split_once(": ") {
        Some((company, title)) if !company.is_empty() && !title.is_empty() => {
            (Some(company.to_string()), title.to_string())
        }
        _ => (None, raw.to_string()),
    }
}

fn parse_feed(bytes: &[u8], skills: &SkillMatcher) -> Result<Vec<JobPost>> {
    let feed = feed_rs::parser::parse(bytes).context("failed to parse RSS/Atom feed")?;

    let mut posts = Vec::new();
    for entry in feed.entries {
        let Some(link) = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))
        else {
            continue;
        };

        let raw_title = entry.title.map(|t| t.content).unwrap_or_default();
        if raw_title.is_empty() {
            continue;
        }
        let (company, title) = split_title(&raw_title);

        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let posted_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        posts.push(JobPost {
            platform: Platform::Wwr,
            platform_id: link.clone(),
            title,
            company,
            location: Some("Remote".to_string()),
            skills: skills.extract(&description),
            budget_min: None,
            budget_max: None,
            budget_type: Default::default(),
            client_country: None,
            client_rating: None,
            posted_at,
            description,
            url: link,
        });
    }
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>We Work Remotely: Remote Programming Jobs</title>
    <item>
      <title>Acme Corp: Senior Java Developer</title>
      <link>https://weworkremotely.com/remote-jobs/acme-corp-senior-java-developer</link>
      <description>Build Java and SQL backends for a distributed team.</description>
      <pubDate>Mon, 20 Jul 2026 08:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Standalone Title Without Company</title>
      <link>https://weworkremotely.com/remote-jobs/standalone-title</link>
      <description>Anything goes.</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn link_is_the_platform_id() {
        let skills = SkillMatcher::default_vocabulary();
        let posts = parse_feed(FIXTURE, &skills).unwrap();
        assert_eq!(posts.len(), 2);

        let first = &posts[0];
        assert_eq!(
            first.natural_key(),
            "wwr_https://weworkremotely.com/remote-jobs/acme-corp-senior-java-developer"
        );
        assert_eq!(first.company.as_deref(), Some("Acme Corp"));
        assert_eq!(first.title, "Senior Java Developer");
        assert!(first.posted_at.is_some());
        assert!(first.skills.contains(&"Java".to_string()));

        let second = &posts[1];
        assert_eq!(second.company, None);
        assert_eq!(second.title, "Standalone Title Without Company");
        assert!(second.posted_at.is_none());
    }

    #[test]
    fn title_split_requires_both_halves() {
        assert_eq!(
            split_title("Acme: Engineer"),
            (Some("Acme".to_string()), "Engineer".to_string())
        );
        assert_eq!(split_title("No company here"), (None, "No company here".to_string()));
    }
}
