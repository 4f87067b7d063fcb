use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::filter::FilterConfig;
use crate::types::Platform;

/// TOML-backed configuration loaded from disk.
/// Secrets (bot token, API keys, DB URL) stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Seconds between pipeline ticks.
    pub scan_interval_secs: u64,
    #[serde(default = "default_seen_file")]
    pub seen_file: PathBuf,
    #[serde(default = "default_max_per_message")]
    pub max_per_message: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Budget floor in dollars; records below it are clamped and
    /// never recommended.
    #[serde(default = "default_min_budget")]
    pub min_budget: f64,
    /// Minimum score for `recommended = true`.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: i64,
    /// The operator's own skills, fed to the scoring prompt and to
    /// skill extraction.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Peak concurrent LLM calls.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_budget: default_min_budget(),
            score_threshold: default_score_threshold(),
            skills: Vec::new(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file (embedded backend only).
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Postgres,
}

/// Per-source configuration. `kind` is a closed enum: a typo'd source
/// kind fails TOML deserialization, i.e. at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Remotive,
    Remoteok,
    Arbeitnow,
    Wwr,
    Upwork,
    Toptal,
}

impl SourceKind {
    pub fn platform(&self) -> Platform {
        match self {
            SourceKind::Remotive => Platform::Remotive,
            SourceKind::Remoteok => Platform::Remoteok,
            SourceKind::Arbeitnow => Platform::Arbeitnow,
            SourceKind::Wwr => Platform::Wwr,
            SourceKind::Upwork => Platform::Upwork,
            SourceKind::Toptal => Platform::Toptal,
        }
    }

    /// HTML sources need a rendered page, i.e. a browserless client.
    pub fn needs_browser(&self) -> bool {
        matches!(self, SourceKind::Upwork | SourceKind::Toptal)
    }
}

fn default_seen_file() -> PathBuf {
    PathBuf::from("workspace/sent_jobs.json")
}

fn default_max_per_message() -> usize {
    10
}

fn default_min_budget() -> f64 {
    300.0
}

fn default_score_threshold() -> i64 {
    70
}

fn default_max_concurrent() -> usize {
    3
}

fn default_db_path() -> PathBuf {
    PathBuf::from("workspace/gigsignal.db")
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_enabled() -> bool {
    true
}

/// Load and parse a TOML config file. Missing or malformed config is a
/// startup failure.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
