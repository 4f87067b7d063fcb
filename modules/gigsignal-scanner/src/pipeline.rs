//! Tick orchestrator: fetch → filter → dedup → score → persist → notify
//! → commit seen-set, with per-stage counts.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use gigsignal_common::{FilterConfig, JobPost, Opportunity, OpportunityStatus};
use gigsignal_store::OpportunityStore;

use crate::notify::Dispatcher;
use crate::scoring::ScoreAnalyzer;
use crate::scrapers::JobScraper;
use crate::seen::SeenSet;

/// Per-source fetch result, kept so degraded sources show up in the
/// tick summary instead of silently shrinking the union.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub name: String,
    pub fetched: usize,
    pub failed: bool,
}

impl fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed {
            write!(f, "{}:failed", self.name)
        } else {
            write!(f, "{}:ok({})", self.name, self.fetched)
        }
    }
}

#[derive(Debug, Default)]
pub struct TickStats {
    pub sources: Vec<SourceOutcome>,
    pub fetched: usize,
    pub filtered: usize,
    /// Already-delivered records whose latest observation was refreshed
    /// in the store.
    pub refreshed: usize,
    pub candidates: usize,
    pub scored: usize,
    pub stored: usize,
    pub notified: usize,
    pub delivered: bool,
    pub cancelled: bool,
}

impl fmt::Display for TickStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources = self
            .sources
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "tick: fetched={} filtered={} refreshed={} candidates={} scored={} stored={} notified={} delivered={} [{sources}]",
            self.fetched,
            self.filtered,
            self.refreshed,
            self.candidates,
            self.scored,
            self.stored,
            self.notified,
            self.delivered,
        )
    }
}

pub struct ScanPipeline {
    scrapers: Vec<Box<dyn JobScraper>>,
    filter: FilterConfig,
    seen: Arc<SeenSet>,
    analyzer: ScoreAnalyzer,
    store: Arc<dyn OpportunityStore>,
    dispatcher: Dispatcher,
}

impl ScanPipeline {
    pub fn new(
        scrapers: Vec<Box<dyn JobScraper>>,
        filter: FilterConfig,
        seen: Arc<SeenSet>,
        analyzer: ScoreAnalyzer,
        store: Arc<dyn OpportunityStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            scrapers,
            filter,
            seen,
            analyzer,
            store,
            dispatcher,
        }
    }

    /// One full pass. Source failures degrade to empty, scoring failures
    /// degrade to fallback records, and cancellation returns whatever
    /// partial results exist — only infrastructure failures (seen-set
    /// I/O) propagate, and the scheduler absorbs those too.
    pub async fn run_tick(&self, cancelled: &Arc<AtomicBool>) -> Result<TickStats> {
        let mut stats = TickStats::default();

        // 1. Fetch all enabled sources in parallel, one task per source,
        //    each capped by its own timeout.
        let fetches: Vec<_> = self
            .scrapers
            .iter()
            .map(|scraper| async move {
                let name = scraper.name().to_string();
                match tokio::time::timeout(scraper.timeout(), scraper.fetch()).await {
                    Ok(Ok(posts)) => (name, Some(posts)),
                    Ok(Err(e)) => {
                        warn!(source = %name, error = %e, "Source fetch failed");
                        (name, None)
                    }
                    Err(_) => {
                        warn!(source = %name, "Source fetch timed out");
                        (name, None)
                    }
                }
            })
            .collect();
        let results: Vec<(String, Option<Vec<JobPost>>)> = stream::iter(fetches)
            .buffer_unordered(self.scrapers.len().max(1))
            .collect()
            .await;

        let mut posts: Vec<JobPost> = Vec::new();
        for (name, result) in results {
            match result {
                Some(fetched) => {
                    stats.sources.push(SourceOutcome {
                        name,
                        fetched: fetched.len(),
                        failed: false,
                    });
                    posts.extend(fetched);
                }
                None => stats.sources.push(SourceOutcome {
                    name,
                    fetched: 0,
                    failed: true,
                }),
            }
        }
        stats.fetched = posts.len();

        // 2. Keyword filter.
        posts.retain(|p| self.filter.matches(&p.title, &p.description));
        stats.filtered = posts.len();

        // 3. Dedup within the tick (two sources or two pages can surface
        //    the same key), then split on the delivered set. Seen records
        //    are refreshed in the store but never re-scored or re-sent.
        let mut in_tick: HashSet<String> = HashSet::new();
        posts.retain(|p| in_tick.insert(p.natural_key()));

        let now = Utc::now();
        let (refreshed, discovered): (Vec<Opportunity>, Vec<Opportunity>) = posts
            .into_iter()
            .map(|p| Opportunity::from_post(p, now))
            .partition(|o| self.seen.is_sent(&o.natural_key));
        stats.refreshed = refreshed.len();
        stats.candidates = discovered.len();

        if !refreshed.is_empty() {
            let report = self.store.batch_upsert(&refreshed).await;
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "Some refreshed records failed to persist");
            }
        }

        if cancelled.load(Ordering::Relaxed) {
            stats.cancelled = true;
            info!("{stats}");
            return Ok(stats);
        }

        // First observation goes into the store before scoring so a
        // crashed tick still leaves discovered records behind.
        let report = self.store.batch_upsert(&discovered).await;
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "Some discovered records failed to persist");
        }

        // 4. Score with bounded concurrency.
        let scored = self.analyzer.batch_analyze(discovered, cancelled).await;
        stats.scored = scored.len();

        // 5. Persist scored records and advance their lifecycle.
        let report = self.store.batch_upsert(&scored).await;
        stats.stored = report.saved;
        for (key, error) in &report.failed {
            warn!(natural_key = %key, error = %error, "Scored record failed to persist");
        }
        for opp in &scored {
            if let Err(e) = self
                .store
                .update_status(&opp.natural_key, OpportunityStatus::Scored, None)
                .await
            {
                warn!(natural_key = %opp.natural_key, error = %e, "Status advance failed");
            }
        }

        if cancelled.load(Ordering::Relaxed) {
            stats.cancelled = true;
            info!("{stats}");
            return Ok(stats);
        }

        // 6. Notify, then commit the seen-set only on full success so a
        //    failed batch is re-sent next tick.
        stats.delivered = self.dispatcher.deliver(&scored).await;
        if stats.delivered && !scored.is_empty() {
            let keys: Vec<String> = scored.iter().map(|o| o.natural_key.clone()).collect();
            self.seen.mark_sent(&keys)?;
            for opp in &scored {
                if let Err(e) = self
                    .store
                    .update_status(&opp.natural_key, OpportunityStatus::Notified, None)
                    .await
                {
                    warn!(natural_key = %opp.natural_key, error = %e, "Status advance failed");
                }
            }
            stats.notified = scored.len();
        }

        info!("{stats}");
        Ok(stats)
    }
}
