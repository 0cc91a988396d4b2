//! Background persistence of discovered pages
//!
//! One saver runs per site job next to the crawl. It takes whatever records
//! are available in the job's buffer, writes them as one batch and goes back
//! for more, until the buffer reports that every writer is gone and nothing is
//! left.

use crate::config::CrawlerConfig;
use crate::crawler::buffer::PageDrain;
use crate::crawler::retry::RetryPolicy;
use crate::storage::{PageRecord, Repository, StorageResult};
use std::sync::Arc;

/// Counters reported by a finished saver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaverStats {
    /// Records persisted
    pub saved: u64,
    /// Records lost after exhausting retries
    pub dropped: u64,
    /// Batches attempted
    pub batches: u64,
}

/// Drains one job's page buffer into the repository
pub struct PageSaver {
    site_id: i64,
    repository: Arc<dyn Repository>,
    drain: PageDrain,
    batch_size: usize,
    retry: RetryPolicy,
}

impl PageSaver {
    pub fn new(
        site_id: i64,
        repository: Arc<dyn Repository>,
        drain: PageDrain,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            site_id,
            repository,
            drain,
            batch_size: config.batch_size,
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Runs until the buffer is closed and empty
    ///
    /// A batch that still fails after the retry budget is dropped and counted;
    /// the saver keeps going with the next one.
    pub async fn run(mut self) -> SaverStats {
        let mut stats = SaverStats::default();

        while let Some(batch) = self.drain.next_batch(self.batch_size).await {
            let len = batch.len() as u64;
            stats.batches += 1;

            match self.persist(batch).await {
                Ok(()) => stats.saved += len,
                Err(e) => {
                    stats.dropped += len;
                    tracing::error!(
                        "Dropping {} pages of site {} after {} retries: {}",
                        len,
                        self.site_id,
                        self.retry.max_retries,
                        e
                    );
                }
            }
        }

        tracing::debug!(
            "Page saver for site {} finished: {} saved, {} dropped in {} batches",
            self.site_id,
            stats.saved,
            stats.dropped,
            stats.batches
        );
        stats
    }

    async fn persist(&self, batch: Vec<PageRecord>) -> StorageResult<()> {
        let what = format!("Saving {} pages of site {}", batch.len(), self.site_id);
        let repository = Arc::clone(&self.repository);
        self.retry
            .run_blocking(&what, move || repository.save_all_pages(&batch))
            .await
    }
}
