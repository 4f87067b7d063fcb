//! Networked backend for production. TLS comes from the sqlx rustls
//! runtime; pass a `postgres://...?sslmode=require` URL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
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
        budget_min DOUBLE PRECISION,
        budget_max DOUBLE PRECISION,
        budget_type TEXT NOT NULL,
        skills_required JSONB NOT NULL,
        client_country TEXT,
        client_rating DOUBLE PRECISION,
        posted_at TIMESTAMPTZ,
        scraped_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        score BIGINT,
        score_reason TEXT,
        score_details JSONB,
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
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
            $16, $17, $18, $19, $20, $21)
    ON CONFLICT (natural_key) DO UPDATE SET
        platform = EXCLUDED.platform,
        title = EXCLUDED.title,
        company = EXCLUDED.company,
        location = EXCLUDED.location,
        description = EXCLUDED.description,
        source_url = EXCLUDED.source_url,
        budget_min = EXCLUDED.budget_min,
        budget_max = EXCLUDED.budget_max,
        budget_type = EXCLUDED.budget_type,
        skills_required = EXCLUDED.skills_required,
        client_country = EXCLUDED.client_country,
        client_rating = EXCLUDED.client_rating,
        posted_at = EXCLUDED.posted_at,
        scraped_at = EXCLUDED.scraped_at,
        updated_at = EXCLUDED.updated_at,
        score = COALESCE(EXCLUDED.score, opportunities.score),
        score_reason = COALESCE(EXCLUDED.score_reason, opportunities.score_reason),
        score_details = COALESCE(EXCLUDED.score_details, opportunities.score_details)
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
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
    skills_required: serde_json::Value,
    client_country: Option<String>,
    client_rating: Option<f64>,
    posted_at: Option<DateTime<Utc>>,
    scraped_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    score: Option<i64>,
    score_reason: Option<String>,
    score_details: Option<serde_json::Value>,
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
        let skills_required: Vec<String> = serde_json::from_value(row.skills_required)?;
        let score_details: Option<ScoreDetails> = row
            .score_details
            .map(serde_json::from_value)
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

impl PgStore {
    /// Connect and run migrations. The pool pre-pings connections on
    /// acquire so a dropped server connection never reaches a query.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("Postgres opportunity store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl OpportunityStore for PgStore {
    async fn upsert(&self, opp: &Opportunity) -> Result<(), StoreError> {
        let skills = serde_json::to_value(&opp.skills_required)?;
        let details = opp
            .score_details
            .as_ref()
            .map(serde_json::to_value)
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
            "SELECT * FROM opportunities WHERE natural_key = $1",
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
        let rows = match exclude_status {
            Some(excluded) => {
                sqlx::query_as::<_, OpportunityRow>(
                    r#"
                    SELECT * FROM opportunities
                    WHERE score IS NOT NULL AND score >= $1 AND status != $2
                    ORDER BY score DESC, created_at ASC
                    LIMIT $3
                    "#,
                )
                .bind(min_score)
                .bind(excluded.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, OpportunityRow>(
                    r#"
                    SELECT * FROM opportunities
                    WHERE score IS NOT NULL AND score >= $1
                    ORDER BY score DESC, created_at ASC
                    LIMIT $2
                    "#,
                )
                .bind(min_score)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Opportunity::try_from).collect()
    }

    async fn list_by_status(
        &self,
        status: OpportunityStatus,
        limit: i64,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let rows = sqlx::query_as::<_, OpportunityRow>(
            r#"
            SELECT * FROM opportunities
            WHERE status = $1
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Opportunity::try_from).collect()
    }

    async fn list_by_platform(
        &self,
        platform: Platform,
        limit: i64,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let rows = sqlx::query_as::<_, OpportunityRow>(
            r#"
            SELECT * FROM opportunities
            WHERE platform = $1
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(platform.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Opportunity::try_from).collect()
    }

    async fn update_status(
        &self,
        key: &str,
        status: OpportunityStatus,
        notes: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM opportunities WHERE natural_key = $1 FOR UPDATE",
        )
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
            SET status = $1, notes = COALESCE($2, notes), updated_at = $3
            WHERE natural_key = $4
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
        // AVG over BIGINT is NUMERIC in Postgres; cast so it decodes as f64.
        let avg_score: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(score)::DOUBLE PRECISION FROM opportunities WHERE score IS NOT NULL",
        )
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
