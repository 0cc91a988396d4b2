//! Storage module for persisting indexing data
//!
//! This module handles all database operations for the indexer:
//! - SQLite database initialization and schema management
//! - Site job lifecycle (create, finalize, delete)
//! - Batched page persistence

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRepository;
pub use traits::{Repository, StorageError, StorageResult};

use crate::state::SiteStatus;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteRepository> {
    SqliteRepository::new(path)
}

/// One site's crawl run as stored in the database
#[derive(Debug, Clone)]
pub struct SiteJob {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Captured result of fetching one URL
///
/// `content` is `None` exactly when the fetch failed, in which case `error`
/// describes the failure and `code` holds the HTTP status if one was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub site_id: i64,
    pub path: String,
    pub code: Option<u16>,
    pub content: Option<String>,
    pub error: Option<String>,
}

impl PageRecord {
    /// A successfully fetched page
    pub fn fetched(site_id: i64, path: String, code: u16, content: String) -> Self {
        Self {
            site_id,
            path,
            code: Some(code),
            content: Some(content),
            error: None,
        }
    }

    /// A page whose fetch failed
    pub fn failed(site_id: i64, path: String, code: Option<u16>, error: String) -> Self {
        Self {
            site_id,
            path,
            code,
            content: None,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.content.is_none()
    }
}

/// Per-site overview used by the `--stats` mode and the end-of-run report
#[derive(Debug, Clone)]
pub struct SiteSummary {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
    pub pages: u64,
    pub failed_pages: u64,
}
