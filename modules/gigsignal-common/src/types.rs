use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GigSignalError;

/// Job sources the pipeline knows how to harvest. Closed set: new sources
/// are a code change, not a config string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Remotive,
    Remoteok,
    Arbeitnow,
    Wwr,
    Upwork,
    Toptal,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Remotive => "remotive",
            Platform::Remoteok => "remoteok",
            Platform::Arbeitnow => "arbeitnow",
            Platform::Wwr => "wwr",
            Platform::Upwork => "upwork",
            Platform::Toptal => "toptal",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = GigSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remotive" => Ok(Platform::Remotive),
            "remoteok" => Ok(Platform::Remoteok),
            "arbeitnow" => Ok(Platform::Arbeitnow),
            "wwr" => Ok(Platform::Wwr),
            "upwork" => Ok(Platform::Upwork),
            "toptal" => Ok(Platform::Toptal),
            other => Err(GigSignalError::Validation(format!(
                "unknown platform: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    Fixed,
    Hourly,
    #[default]
    Unknown,
}

impl BudgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetType::Fixed => "fixed",
            BudgetType::Hourly => "hourly",
            BudgetType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BudgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetType {
    type Err = GigSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(BudgetType::Fixed),
            "hourly" => Ok(BudgetType::Hourly),
            "unknown" => Ok(BudgetType::Unknown),
            other => Err(GigSignalError::Validation(format!(
                "unknown budget type: {other}"
            ))),
        }
    }
}

/// Lifecycle of a stored opportunity. Transitions only move forward;
/// `Won` and `Rejected` are both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    Discovered,
    Scored,
    Notified,
    Applied,
    Won,
    Rejected,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Discovered => "discovered",
            OpportunityStatus::Scored => "scored",
            OpportunityStatus::Notified => "notified",
            OpportunityStatus::Applied => "applied",
            OpportunityStatus::Won => "won",
            OpportunityStatus::Rejected => "rejected",
        }
    }

    /// Monotone lifecycle rank. A status update is only applied when the
    /// new rank is at least the current one.
    pub fn rank(&self) -> u8 {
        match self {
            OpportunityStatus::Discovered => 0,
            OpportunityStatus::Scored => 1,
            OpportunityStatus::Notified => 2,
            OpportunityStatus::Applied => 3,
            OpportunityStatus::Won | OpportunityStatus::Rejected => 4,
        }
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityStatus {
    type Err = GigSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(OpportunityStatus::Discovered),
            "scored" => Ok(OpportunityStatus::Scored),
            "notified" => Ok(OpportunityStatus::Notified),
            "applied" => Ok(OpportunityStatus::Applied),
            "won" => Ok(OpportunityStatus::Won),
            "rejected" => Ok(OpportunityStatus::Rejected),
            other => Err(GigSignalError::Validation(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

/// Structured scoring output beyond the headline score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    pub match_score: i64,
    pub budget_reasonable: bool,
    pub requirement_clear: bool,
    pub estimated_hours: f64,
    pub suggested_bid: f64,
    pub recommended: bool,
    pub risks: Vec<String>,
    pub strengths: Vec<String>,
}

/// A normalized posting as it leaves a scraper: validated shape, parsed
/// budget, canonical skills — no score, no lifecycle state yet.
#[derive(Debug, Clone)]
pub struct JobPost {
    pub platform: Platform,
    pub platform_id: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub url: String,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub budget_type: BudgetType,
    pub skills: Vec<String>,
    pub client_country: Option<String>,
    pub client_rating: Option<f64>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl JobPost {
    /// Idempotency key: `{platform}_{platform_id}`.
    pub fn natural_key(&self) -> String {
        format!("{}_{}", self.platform, self.platform_id)
    }
}

/// The central stored record.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub natural_key: String,
    pub platform: Platform,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub source_url: String,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub budget_type: BudgetType,
    pub skills_required: Vec<String>,
    pub client_country: Option<String>,
    pub client_rating: Option<f64>,
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score: Option<i64>,
    pub score_reason: Option<String>,
    pub score_details: Option<ScoreDetails>,
    pub status: OpportunityStatus,
}

impl Opportunity {
    /// First observation of a posting. `created_at`/`updated_at` are
    /// provisional: the store preserves the original `created_at` when
    /// the key already exists.
    pub fn from_post(post: JobPost, now: DateTime<Utc>) -> Self {
        Self {
            natural_key: post.natural_key(),
            platform: post.platform,
            title: post.title,
            company: post.company,
            location: post.location,
            description: post.description,
            source_url: post.url,
            budget_min: post.budget_min,
            budget_max: post.budget_max,
            budget_type: post.budget_type,
            skills_required: post.skills,
            client_country: post.client_country,
            client_rating: post.client_rating,
            posted_at: post.posted_at,
            scraped_at: now,
            created_at: now,
            updated_at: now,
            score: None,
            score_reason: None,
            score_details: None,
            status: OpportunityStatus::Discovered,
        }
    }

    /// Render the parsed budget for humans ("$500-1000", "$80/hr").
    pub fn budget_display(&self) -> Option<String> {
        let fmt_amount = |v: f64| {
            if v.fract() == 0.0 {
                format!("{}", v as i64)
            } else {
                format!("{v:.2}")
            }
        };
        let range = match (self.budget_min, self.budget_max) {
            (Some(min), Some(max)) if (min - max).abs() > f64::EPSILON => {
                format!("${}-{}", fmt_amount(min), fmt_amount(max))
            }
            (Some(min), _) => format!("${}", fmt_amount(min)),
            (None, Some(max)) => format!("${}", fmt_amount(max)),
            (None, None) => return None,
        };
        Some(match self.budget_type {
            BudgetType::Hourly => format!("{range}/hr"),
            _ => range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> JobPost {
        JobPost {
            platform: Platform::Remotive,
            platform_id: "12345".to_string(),
            title: "Senior Rust Developer".to_string(),
            company: Some("Acme".to_string()),
            location: Some("Worldwide".to_string()),
            description: "Build things".to_string(),
            url: "https://remotive.com/jobs/12345".to_string(),
            budget_min: Some(80.0),
            budget_max: Some(120.0),
            budget_type: BudgetType::Hourly,
            skills: vec!["Rust".to_string()],
            client_country: None,
            client_rating: None,
            posted_at: None,
        }
    }

    #[test]
    fn natural_key_is_platform_prefixed() {
        assert_eq!(post().natural_key(), "remotive_12345");
    }

    #[test]
    fn from_post_starts_discovered_and_unscored() {
        let opp = Opportunity::from_post(post(), Utc::now());
        assert_eq!(opp.status, OpportunityStatus::Discovered);
        assert!(opp.score.is_none());
        assert_eq!(opp.created_at, opp.updated_at);
        assert_eq!(opp.natural_key, "remotive_12345");
    }

    #[test]
    fn status_rank_is_monotone_with_shared_terminal() {
        assert!(OpportunityStatus::Scored.rank() > OpportunityStatus::Discovered.rank());
        assert!(OpportunityStatus::Notified.rank() > OpportunityStatus::Scored.rank());
        assert_eq!(
            OpportunityStatus::Won.rank(),
            OpportunityStatus::Rejected.rank()
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OpportunityStatus::Discovered,
            OpportunityStatus::Scored,
            OpportunityStatus::Notified,
            OpportunityStatus::Applied,
            OpportunityStatus::Won,
            OpportunityStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<OpportunityStatus>().unwrap(), status);
        }
    }

    #[test]
    fn budget_display_formats_ranges_and_rates() {
        let mut opp = Opportunity::from_post(post(), Utc::now());
        assert_eq!(opp.budget_display().as_deref(), Some("$80-120/hr"));

        opp.budget_type = BudgetType::Fixed;
        opp.budget_min = Some(1500.0);
        opp.budget_max = Some(1500.0);
        assert_eq!(opp.budget_display().as_deref(), Some("$1500"));

        opp.budget_min = None;
        opp.budget_max = None;
        assert_eq!(opp.budget_display(), None);
    }
}
