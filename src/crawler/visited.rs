//! Per-job set of visited URLs

use dashmap::DashSet;
use url::Url;

/// Concurrent membership set of the normalized URLs a job has claimed
///
/// Grows monotonically for the lifetime of one job's crawl. `insert` is the
/// single atomic test-and-insert that decides which of several racing tasks
/// gets to fetch a URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url`; returns false if it was already claimed
    pub fn insert(&self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
