//! Indexing coordinator - start/stop orchestration of site jobs
//!
//! The coordinator owns the process-wide [`IndexingStatus`] and drives one
//! run at a time:
//! - Preparing a fresh job per configured site (old data is removed first)
//! - Launching one site worker per job, each with its own crawl pool and saver
//! - Two-tier stop: cooperative cancellation, then a hard abort after a grace
//!   period
//! - Finalizing every job as INDEXED or FAILED

use crate::config::{Config, CrawlerConfig, SiteEntry};
use crate::crawler::buffer::page_buffer;
use crate::crawler::fetcher::{FetchClient, HttpFetcher};
use crate::crawler::monitor::{watch_run, SiteOutcome};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::saver::{PageSaver, SaverStats};
use crate::crawler::task::{crawl_page, CrawlError, JobContext};
use crate::state::{IndexingStatus, SiteStatus};
use crate::storage::{open_storage, Repository, StorageError};
use crate::url::SiteScope;
use crate::{IndexerError, UrlError};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// `last_error` of jobs cut short by a stop request
pub const STOPPED_BY_USER: &str = "Indexing stopped by user";

/// Errors returned by the control operations
#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("Indexing is already running")]
    AlreadyRunning,

    #[error("Indexing is not running")]
    NotRunning,

    #[error("Invalid site URL '{url}': {source}")]
    InvalidSite {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error("Failed to prepare site jobs: {0}")]
    Storage(#[from] StorageError),
}

/// Main indexing coordinator
pub struct Coordinator {
    sites: Vec<SiteEntry>,
    settings: CrawlerConfig,
    repository: Arc<dyn Repository>,
    fetcher: Arc<dyn FetchClient>,
    status: Arc<watch::Sender<IndexingStatus>>,
    /// Stop token of the current run; the lock also serializes start and stop
    control: Mutex<Option<CancellationToken>>,
    dropped_pages: Arc<AtomicU64>,
}

impl Coordinator {
    /// Creates a coordinator over explicit storage and fetch capabilities
    pub fn new(
        config: &Config,
        repository: Arc<dyn Repository>,
        fetcher: Arc<dyn FetchClient>,
    ) -> Self {
        let (status, _) = watch::channel(IndexingStatus::Stopped);
        Self {
            sites: config.sites.clone(),
            settings: config.crawler.clone(),
            repository,
            fetcher,
            status: Arc::new(status),
            control: Mutex::new(None),
            dropped_pages: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a coordinator backed by the configured SQLite database and an
    /// HTTP fetcher
    pub fn from_config(config: &Config) -> Result<Self, IndexerError> {
        let repository = open_storage(Path::new(&config.output.database_path))?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::new(config, Arc::new(repository), Arc::new(fetcher)))
    }

    /// Starts indexing every configured site
    ///
    /// Each site's previous data is deleted and a fresh job is created before
    /// anything is launched; if that preparation fails nothing is started and
    /// the status stays `Stopped`. Returns as soon as the site workers are
    /// spawned; crawling continues in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start_indexing(&self) -> Result<(), IndexingError> {
        let mut control = self.control.lock().await;
        if self.status().is_running() {
            return Err(IndexingError::AlreadyRunning);
        }

        let scopes = self
            .sites
            .iter()
            .map(|site| {
                SiteScope::new(&site.url)
                    .map(|scope| (site.name.clone(), scope))
                    .map_err(|source| IndexingError::InvalidSite {
                        url: site.url.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let repository = Arc::clone(&self.repository);
        let jobs = tokio::task::spawn_blocking(move || prepare_jobs(repository.as_ref(), scopes))
            .await
            .map_err(|e| StorageError::Database(format!("job preparation failed: {}", e)))??;

        let run = CancellationToken::new();
        let started = Instant::now();
        self.status.send_replace(IndexingStatus::Running);
        tracing::info!("Indexing started for {} sites", jobs.len());

        let mut workers = JoinSet::new();
        for job in jobs {
            let worker = SiteWorker {
                job,
                repository: Arc::clone(&self.repository),
                fetcher: Arc::clone(&self.fetcher),
                settings: self.settings.clone(),
                cancel: run.child_token(),
            };
            workers.spawn(worker.run());
        }

        tokio::spawn(watch_run(
            workers,
            Arc::clone(&self.status),
            Arc::clone(&self.dropped_pages),
            started,
        ));

        *control = Some(run);
        Ok(())
    }

    /// Requests every running job to stop
    ///
    /// Returns immediately. In-flight work gets the configured grace period to
    /// wind down before it is aborted; the status turns `Stopped` once every
    /// job has been finalized.
    pub async fn stop_indexing(&self) -> Result<(), IndexingError> {
        let control = self.control.lock().await;
        if !self.status().is_running() {
            return Err(IndexingError::NotRunning);
        }

        if let Some(run) = control.as_ref() {
            tracing::info!("Stopping indexing");
            run.cancel();
        }
        Ok(())
    }

    /// Current process-wide status
    pub fn status(&self) -> IndexingStatus {
        *self.status.borrow()
    }

    /// Observes status changes
    pub fn subscribe(&self) -> watch::Receiver<IndexingStatus> {
        self.status.subscribe()
    }

    /// Resolves once no run is active
    pub async fn wait_until_stopped(&self) {
        let mut rx = self.status.subscribe();
        let _ = rx.wait_for(|status| !status.is_running()).await;
    }

    /// Page records lost by savers since this coordinator was created
    pub fn dropped_pages(&self) -> u64 {
        self.dropped_pages.load(Ordering::Relaxed)
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }
}

/// A site job ready to be crawled
struct PreparedJob {
    id: i64,
    name: String,
    scope: SiteScope,
}

fn prepare_jobs(
    repository: &dyn Repository,
    scopes: Vec<(String, SiteScope)>,
) -> Result<Vec<PreparedJob>, StorageError> {
    let mut jobs = Vec::with_capacity(scopes.len());
    for (name, scope) in scopes {
        let url = scope.root().as_str();
        repository.delete_site_data(url)?;
        let id = repository.create_site_job(url, &name)?;
        tracing::info!("Created job {} for '{}' ({})", id, name, url);
        jobs.push(PreparedJob { id, name, scope });
    }
    Ok(jobs)
}

/// Drives one site job from launch to finalization
struct SiteWorker {
    job: PreparedJob,
    repository: Arc<dyn Repository>,
    fetcher: Arc<dyn FetchClient>,
    settings: CrawlerConfig,
    cancel: CancellationToken,
}

impl SiteWorker {
    async fn run(self) -> SiteOutcome {
        let PreparedJob { id, name, scope } = self.job;

        let (buffer, drain) = page_buffer();
        let saver = tokio::spawn(
            PageSaver::new(id, Arc::clone(&self.repository), drain, &self.settings).run(),
        );

        let root = scope.root().clone();
        let ctx = Arc::new(JobContext::new(
            id,
            scope,
            buffer,
            self.fetcher,
            self.cancel.clone(),
            self.settings.parallelism,
        ));
        let mut pool = tokio::spawn(crawl_page(Arc::clone(&ctx), root));

        let (joined, aborted) = tokio::select! {
            joined = &mut pool => (joined, false),
            _ = self.cancel.cancelled() => {
                let grace = Duration::from_millis(self.settings.stop_grace_period_ms);
                match tokio::time::timeout(grace, &mut pool).await {
                    Ok(joined) => (joined, false),
                    Err(_) => {
                        tracing::warn!(
                            "Site '{}' did not stop within {} ms, aborting its tasks",
                            name,
                            grace.as_millis()
                        );
                        pool.abort();
                        (pool.await, true)
                    }
                }
            }
        };

        // a stop that arrived after the crawl was complete cut nothing short
        let stopped = aborted || ctx.was_interrupted();
        // the saver ends only once every buffer handle is gone
        drop(ctx);

        let (status, last_error) = job_outcome(joined, stopped);
        if let Some(reason) = &last_error {
            tracing::warn!("Site '{}' failed: {}", name, reason);
        }

        let repository = Arc::clone(&self.repository);
        let finalized = RetryPolicy::from_config(&self.settings)
            .run_blocking(&format!("Finalizing job {}", id), move || {
                repository.update_job_status(id, status, last_error.as_deref())
            })
            .await;
        if let Err(e) = finalized {
            tracing::error!("Failed to finalize job {}: {}", id, e);
        }

        let stats = saver.await.unwrap_or_else(|e| {
            tracing::error!("Page saver of job {} crashed: {}", id, e);
            SaverStats::default()
        });

        SiteOutcome {
            job_id: id,
            name,
            status,
            saved: stats.saved,
            dropped: stats.dropped,
        }
    }
}

/// Maps how a job's pool ended to its terminal status
///
/// A fatal error wins over a stop request.
fn job_outcome(
    joined: Result<Result<(), CrawlError>, JoinError>,
    stopped: bool,
) -> (SiteStatus, Option<String>) {
    let fatal = match joined {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(e) => CrawlError::from_join_error(e),
    };

    match fatal {
        Some(e) => (SiteStatus::Failed, Some(e.to_string())),
        None if stopped => (SiteStatus::Failed, Some(STOPPED_BY_USER.to_string())),
        None => (SiteStatus::Indexed, None),
    }
}
