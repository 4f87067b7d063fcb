//! Periodic driver. Immediate first tick, fixed cadence after that,
//! skipped fires while a tick is still running, and a short fixed
//! backoff after failures so a persistent error cannot busy-loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::pipeline::ScanPipeline;

/// Sleep after a failed tick before the cadence resumes.
const FAILURE_BACKOFF: Duration = Duration::from_secs(10);

/// How long `stop` waits for an in-flight tick.
const STOP_GRACE: Duration = Duration::from_secs(30);

/// Margin under the interval after which a tick is considered slow.
const SOFT_DEADLINE_MARGIN: Duration = Duration::from_secs(5);

pub struct ScanScheduler {
    pipeline: Arc<ScanPipeline>,
    interval: Duration,
}

/// Handle to a running scheduler. Consuming `stop` makes double-stop
/// unrepresentable.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ScanScheduler {
    pub fn new(pipeline: Arc<ScanPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Spawn the driver task: one tick immediately, then every interval.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancelled.clone();
        let interval = self.interval;
        let pipeline = self.pipeline;

        let task = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Scan scheduler started");
            let mut ticker = tokio::time::interval(interval);
            // A tick still running when the timer fires skips that fire.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }
                if *shutdown_rx.borrow() {
                    break;
                }

                let started = Instant::now();
                match pipeline.run_tick(&cancel_flag).await {
                    Ok(stats) => {
                        let elapsed = started.elapsed();
                        if interval > SOFT_DEADLINE_MARGIN
                            && elapsed > interval - SOFT_DEADLINE_MARGIN
                        {
                            warn!(
                                elapsed_secs = elapsed.as_secs(),
                                interval_secs = interval.as_secs(),
                                "Tick ran close to or past the scan interval"
                            );
                        }
                        if stats.cancelled {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Tick failed, backing off");
                        tokio::select! {
                            _ = tokio::time::sleep(FAILURE_BACKOFF) => {}
                            _ = shutdown_rx.changed() => break,
                        }
                    }
                }
            }
            info!("Scan scheduler stopped");
        });

        SchedulerHandle {
            shutdown,
            cancelled,
            task,
        }
    }
}

impl SchedulerHandle {
    /// The cancel flag in-flight work observes. Exposed so callers can
    /// wire it into signal handling.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Signal cancellation and wait (bounded) for the in-flight tick.
    pub async fn stop(self) {
        self.cancelled.store(true, Ordering::Relaxed);
        let _ = self.shutdown.send(true);
        match tokio::time::timeout(STOP_GRACE, self.task).await {
            Ok(_) => {}
            Err(_) => warn!("In-flight tick did not finish within the stop grace period"),
        }
    }
}
