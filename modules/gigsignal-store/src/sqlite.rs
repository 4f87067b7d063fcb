//! Embedded single-file backend for offline/dev use.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use gigsignal_common::{Opportunity, OpportunityStatus, Platform, ScoreDetails};

use crate::error::StoreError;
use crate::{OpportunityStore, StoreStats};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS opportunities (
        natural_key TEXT PRIMARY KEY,
        platform TEXT NOT NULL,
        title TEXT NOT NULL,
        company TEXT,
        location TEXT,
        description TEXT NOT NULL,
        source_url TEXT NOT NULL,
        budget_min REAL,
        budget_max REAL,
        budget_type TEXT NOT NULL,
        skills_required TEXT NOT NULL,
        client_country TEXT,
        client_rating REAL,
        posted_at TEXT,
        scraped_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        score INTEGER,
        score_reason TEXT,
        score_details TEXT,
        status TEXT NOT NULL,
        notes TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_opportunities_score ON opportunities(score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_opportunities_status ON opportunities(status)",
    "CREATE INDEX IF NOT EXISTS idx_opportunities_platform ON opportunities(platform)",
];

const UPSERT_SQL: &str = r#"
    INSERT INTO opportunities
        (natural_key, platform, title, company, location, description, source_url,
         budget_min, budget_max, budget_type, skills_required, client_country,
         client_rating, posted_at, scraped_at, created_at, updated_at,
         score, score_reason, score_details, status)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(natural_key) DO UPDATE SET
        platform = excluded.platform,
        title = excluded.title,
        company = excluded.company,
        location = excluded.location,
        description = excluded.description,
        source_url = excluded.source_url,
        budget_min = excluded.budget_min,
        budget_max = excluded.budget_max,
        budget_type = excluded.budget_type,
        skills_required = excluded.skills_required,
        client_country = excluded.client_country,
        client_rating = excluded.client_rating,
        posted_at = excluded.posted_at,
        scraped_at = excluded.scraped_at,
        updated_at = excluded.updated_at,
        score = COALESCE(excluded.score, opportunities.score),
        score_reason = COALESCE(excluded.score_reason, opportunities.score_reason),
        score_details = COALESCE(excluded.score_details, opportunities.score_details)
"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct OpportunityRow {
    natural_key: String,
    platform: String,
    title: String,
    company: Option<String>,
    location: Option<String>,
    description: String,
    source_url: String,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
    budget_type: String,
    skills_required: String,
    client_country: Option<String>,
    client_rating: Option<f64>,
    posted_at: Option<DateTime<Utc>>,
    scraped_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    score: Option<i64>,
    score_reason: Option<String>,
    score_details: Option<String>,
    status: String,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = StoreError;

    fn try_from(row: OpportunityRow) -> Result<Self, Self::Error> {
        let platform: Platform = row
            .platform
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        let budget_type = row
            .budget_type
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        let status: OpportunityStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        let skills_required: Vec<String> = serde_json::from_str(&row.skills_required)?;
        let score_details: Option<ScoreDetails> = row
            .score_details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Opportunity {
            natural_key: row.natural_key,
            platform,
            title: row.title,
            company: row.company,
            location: row.location,
            description: row.description,
            source_url: row.source_url,
            budget_min: row.budget_min,
            budget_max: row.budget_max,
            budget_type,
            skills_required,
            client_country: row.client_country,
            client_rating: row.client_rating,
            posted_at: row.posted_at,
            scraped_at: row.scraped_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            score: row.score,
            score_reason: row.score_reason,
            score_details,
            status,
        })
    }
}

impl SqliteStore {
    /// Open (or create) a database file and run migrations.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Corrupt(format!(
                        "cannot create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.display(), "SQLite opportunity store ready");
        Ok(store)
    }

    /// In-memory database for tests. Single connection: every pooled
    /// connection to `:memory:` would otherwise see its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_rows(
        &self,
        sql: &str,
        binds: Vec<BindValue>,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let mut query = sqlx::query_as::<_, OpportunityRow>(sql);
        for bind in binds {
            query = match bind {
                BindValue::Text(v) => query.bind(v),
                BindValue::Int(v) => query.bind(v),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Opportunity::try_from).collect()
    }
}

enum BindValue {
    Text(String),
    Int(i64),
}

#[async_trait]
impl OpportunityStore for SqliteStore {
    async fn upsert(&self, opp: &Opportunity) -> Result<(), StoreError> {
        let skills = serde_json::to_string(&opp.skills_required)?;
        let details = opp
            .score_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now();

        sqlx::query(UPSERT_SQL)
            .bind(&opp.natural_key)
            .bind(opp.platform.as_str())
            .bind(&opp.title)
            .bind(&opp.company)
            .bind(&opp.location)
            .bind(&opp.description)
            .bind(&opp.source_url)
            .bind(opp.budget_min)
            .bind(opp.budget_max)
            .bind(opp.budget_type.as_str())
            .bind(&skills)
            .bind(&opp.client_country)
            .bind(opp.client_rating)
            .bind(opp.posted_at)
            .bind(opp.scraped_at)
            .bind(opp.created_at)
            .bind(now)
            .bind(opp.score)
            .bind(&opp.score_reason)
            .bind(&details)
            .bind(opp.status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_natural_key(&self, key: &str) -> Result<Option<Opportunity>, StoreError> {
        let row = sqlx::query_as::<_, OpportunityRow>(
            "SELECT * FROM opportunities WHERE natural_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Opportunity::try_from).transpose()
    }

    async fn get_top(
        &self,
        limit: i64,
        min_score: i64,
        exclude_status: Option<OpportunityStatus>,
    ) -> Result<Vec<Opportunity>, StoreError> {
        match exclude_status {
            Some(excluded) => {
                self.fetch_rows(
                    r#"
                    SELECT * FROM opportunities
                    WHERE score IS NOT NULL AND score >= ? AND status != ?
                    ORDER BY score DESC, created_at ASC
                    LIMIT ?
                    "#,
                    vec![
                        BindValue::Int(min_score),
                        BindValue::Text(excluded.as_str().to_string()),
                        BindValue::Int(limit),
                    ],
                )
                .await
            }
            None => {
                self.fetch_rows(
                    r#"
                    SELECT * FROM opportunities
                    WHERE score IS NOT NULL AND score >= ?
                    ORDER BY score DESC, created_at ASC
                    LIMIT ?
                    "#,
                    vec![BindValue::Int(min_score), BindValue::Int(limit)],
                )
                .await
            }
        }
    }

    async fn list_by_status(
        &self,
        status: OpportunityStatus,
        limit: i64,
    ) -> Result<Vec<Opportunity>, StoreError> {
        self.fetch_rows(
            r#"
            SELECT * FROM opportunities
            WHERE status = ?
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
            vec![
                BindValue::Text(status.as_str().to_string()),
                BindValue::Int(limit),
            ],
        )
        .await
    }

    async fn list_by_platform(
        &self,
        platform: Platform,
        limit: i64,
    ) -> Result<Vec<Opportunity>, StoreError> {
        self.fetch_rows(
            r#"
            SELECT * FROM opportunities
            WHERE platform = ?
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
            vec![
                BindValue::Text(platform.as_str().to_string()),
                BindValue::Int(limit),
            ],
        )
        .await
    }

    async fn update_status(
        &self,
        key: &str,
        status: OpportunityStatus,
        notes: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM opportunities WHERE natural_key = ?")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current) = current else {
            return Ok(false);
        };
        let current: OpportunityStatus = current
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        if status.rank() < current.rank() {
            warn!(
                natural_key = key,
                from = %current,
                to = %status,
                "Refusing status rollback"
            );
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE opportunities
            SET status = ?, notes = COALESCE(?, notes), updated_at = ?
            WHERE natural_key = ?
            "#,
        )
        .bind(status.as_str())
        .bind(notes)
        .bind(Utc::now())
        .bind(key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM opportunities")
            .fetch_one(&self.pool)
            .await?;
        let by_status: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM opportunities GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        let by_platform: Vec<(String, i64)> = sqlx::query_as(
            "SELECT platform, COUNT(*) FROM opportunities GROUP BY platform",
        )
        .fetch_all(&self.pool)
        .await?;
        let avg_score: Option<f64> =
            sqlx::query_scalar("SELECT AVG(score) FROM opportunities WHERE score IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        let high_score_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM opportunities WHERE score >= 80")
                .fetch_one(&self.pool)
                .await?;

        Ok(StoreStats {
            total,
            by_status: by_status.into_iter().collect(),
            by_platform: by_platform.into_iter().collect(),
            avg_score,
            high_score_count,
        })
    }
}
