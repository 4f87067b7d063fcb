pub mod error;
pub mod postgres;
pub mod sqlite;

pub use error::StoreError;
pub use postgres::PgStore;
pub use sqlite::SqliteStore;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use gigsignal_common::{Opportunity, OpportunityStatus, Platform};

/// Aggregate numbers over the whole table.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: i64,
    pub by_status: HashMap<String, i64>,
    pub by_platform: HashMap<String, i64>,
    pub avg_score: Option<f64>,
    pub high_score_count: i64,
}

/// Outcome of a batch upsert. Each record commits on its own; a failure
/// never takes the rest of the batch down with it.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: usize,
    pub failed: Vec<(String, StoreError)>,
}

/// Persistence contract shared by the embedded (SQLite) and networked
/// (Postgres) back-ends.
///
/// Upsert semantics: insert when `natural_key` is new, otherwise update
/// every mutable field. `created_at` and `status` survive updates; the
/// store stamps `updated_at` itself so it strictly advances. Score
/// fields only overwrite when the incoming record carries a score, so
/// an unscored re-observation never erases an earlier scoring.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    async fn upsert(&self, opp: &Opportunity) -> Result<(), StoreError>;

    async fn get_by_natural_key(&self, key: &str) -> Result<Option<Opportunity>, StoreError>;

    /// Highest-scoring records, `score DESC, created_at ASC`.
    async fn get_top(
        &self,
        limit: i64,
        min_score: i64,
        exclude_status: Option<OpportunityStatus>,
    ) -> Result<Vec<Opportunity>, StoreError>;

    async fn list_by_status(
        &self,
        status: OpportunityStatus,
        limit: i64,
    ) -> Result<Vec<Opportunity>, StoreError>;

    async fn list_by_platform(
        &self,
        platform: Platform,
        limit: i64,
    ) -> Result<Vec<Opportunity>, StoreError>;

    /// Advance the lifecycle status. Returns `Ok(false)` when the key is
    /// unknown or the transition would move backwards (status never
    /// rolls back).
    async fn update_status(
        &self,
        key: &str,
        status: OpportunityStatus,
        notes: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Upsert a batch, one transaction per record. Partial success is
    /// expected; failures are reported per key.
    async fn batch_upsert(&self, opps: &[Opportunity]) -> BatchReport {
        let mut report = BatchReport::default();
        for opp in opps {
            match self.upsert(opp).await {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    warn!(natural_key = %opp.natural_key, error = %e, "Upsert failed");
                    report.failed.push((opp.natural_key.clone(), e));
                }
            }
        }
        report
    }
}
