//! Run-level status monitor

use crate::state::{IndexingStatus, SiteStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;

/// How one site job of a run ended
#[derive(Debug, Clone)]
pub struct SiteOutcome {
    pub job_id: i64,
    pub name: String,
    pub status: SiteStatus,
    pub saved: u64,
    pub dropped: u64,
}

/// Waits for every site worker of a run, then flips the run to `Stopped`
///
/// This is the only place a run ends, so `Stopped` is published exactly once
/// per successful start.
pub(crate) async fn watch_run(
    mut workers: JoinSet<SiteOutcome>,
    status: Arc<watch::Sender<IndexingStatus>>,
    dropped_pages: Arc<AtomicU64>,
    started: Instant,
) {
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(outcome) => {
                dropped_pages.fetch_add(outcome.dropped, Ordering::Relaxed);
                tracing::info!(
                    "Site '{}' (job {}) finished {}: {} pages saved, {} dropped",
                    outcome.name,
                    outcome.job_id,
                    outcome.status,
                    outcome.saved,
                    outcome.dropped
                );
            }
            Err(e) => tracing::error!("Site worker crashed: {}", e),
        }
    }

    status.send_replace(IndexingStatus::Stopped);
    tracing::info!("Indexing finished in {}", format_elapsed(started.elapsed()));
}

/// Formats a run duration as `N min M sec`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{} min {} sec", secs / 60, secs % 60)
}
