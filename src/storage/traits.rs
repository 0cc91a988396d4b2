//! Storage traits and error types
//!
//! This module defines the repository interface the crawl engine persists
//! through, and its error type.

use crate::state::SiteStatus;
use crate::storage::{PageRecord, SiteJob, SiteSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site job not found: {0}")]
    JobNotFound(i64),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: SiteStatus, to: SiteStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true for failures a later attempt may not hit again
    ///
    /// Rejected transitions and unknown jobs are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_) | Self::Sqlite(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Implementations must be safe to call concurrently from different site jobs.
/// No cross-job transactions are required.
pub trait Repository: Send + Sync {
    // ===== Site Jobs =====

    /// Deletes the job stored for `url` together with all of its pages
    fn delete_site_data(&self, url: &str) -> StorageResult<()>;

    /// Creates a job in `INDEXING` state stamped with the current time
    ///
    /// # Returns
    ///
    /// The ID of the newly created job
    fn create_site_job(&self, url: &str, name: &str) -> StorageResult<i64>;

    /// Moves a job to a terminal status
    ///
    /// Fails with `InvalidTransition` if the job is already terminal.
    fn update_job_status(
        &self,
        job_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a job by ID
    fn get_site_job(&self, job_id: i64) -> StorageResult<SiteJob>;

    /// Gets the job stored for a site URL
    fn get_site_job_by_url(&self, url: &str) -> StorageResult<Option<SiteJob>>;

    // ===== Pages =====

    /// Persists a batch of page records atomically
    fn save_all_pages(&self, records: &[PageRecord]) -> StorageResult<()>;

    /// Gets every page stored for a job, ordered by path
    fn get_pages(&self, job_id: i64) -> StorageResult<Vec<PageRecord>>;

    // ===== Statistics =====

    /// Gets a summary row for every stored job
    fn site_summaries(&self) -> StorageResult<Vec<SiteSummary>>;
}
