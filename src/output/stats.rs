//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! per-site indexing results from the storage layer.

use crate::state::SiteStatus;
use crate::storage::{Repository, SiteSummary, StorageResult};

/// Indexing statistics summary
#[derive(Debug, Clone)]
pub struct IndexStatistics {
    /// One entry per stored site job, in creation order
    pub sites: Vec<SiteSummary>,

    /// Total number of captured pages across all sites
    pub total_pages: u64,

    /// Pages whose fetch failed
    pub failed_pages: u64,
}

impl IndexStatistics {
    pub fn from_summaries(sites: Vec<SiteSummary>) -> Self {
        let total_pages = sites.iter().map(|s| s.pages).sum();
        let failed_pages = sites.iter().map(|s| s.failed_pages).sum();
        Self {
            sites,
            total_pages,
            failed_pages,
        }
    }

    /// Number of sites that ended with the given status
    pub fn count_with_status(&self, status: SiteStatus) -> usize {
        self.sites.iter().filter(|s| s.status == status).count()
    }
}

/// Loads statistics from storage
pub fn load_statistics(repository: &dyn Repository) -> StorageResult<IndexStatistics> {
    Ok(IndexStatistics::from_summaries(repository.site_summaries()?))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.sites.len());
    println!("  Indexed: {}", stats.count_with_status(SiteStatus::Indexed));
    println!("  Failed: {}", stats.count_with_status(SiteStatus::Failed));
    println!("  Indexing: {}", stats.count_with_status(SiteStatus::Indexing));
    println!("  Total pages captured: {}", stats.total_pages);
    println!();

    if !stats.sites.is_empty() {
        println!("Sites:");
        for site in &stats.sites {
            println!("  {} ({})", site.name, site.url);
            println!("    Status: {} at {}", site.status, site.status_time);
            if let Some(error) = &site.last_error {
                println!("    Last error: {}", error);
            }
            println!(
                "    Pages: {} ({} failed)",
                site.pages, site.failed_pages
            );
        }
        println!();
    }

    let fetched = stats.total_pages - stats.failed_pages;
    let success_rate = if stats.total_pages > 0 {
        (fetched as f64 / stats.total_pages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully fetched)",
        success_rate, fetched, stats.total_pages
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageRecord, SqliteRepository};

    fn summary(name: &str, status: SiteStatus, pages: u64, failed_pages: u64) -> SiteSummary {
        SiteSummary {
            url: format!("https://{}.example.com/", name),
            name: name.to_string(),
            status,
            status_time: "2024-01-01T00:00:00+00:00".to_string(),
            last_error: None,
            pages,
            failed_pages,
        }
    }

    #[test]
    fn test_statistics_totals() {
        let stats = IndexStatistics::from_summaries(vec![
            summary("a", SiteStatus::Indexed, 100, 4),
            summary("b", SiteStatus::Failed, 20, 20),
            summary("c", SiteStatus::Indexed, 0, 0),
        ]);

        assert_eq!(stats.total_pages, 120);
        assert_eq!(stats.failed_pages, 24);
        assert_eq!(stats.count_with_status(SiteStatus::Indexed), 2);
        assert_eq!(stats.count_with_status(SiteStatus::Failed), 1);
        assert_eq!(stats.count_with_status(SiteStatus::Indexing), 0);
    }

    #[test]
    fn test_load_statistics_from_repository() {
        let repo = SqliteRepository::new_in_memory().unwrap();
        let id = repo.create_site_job("https://a.example.com/", "A").unwrap();
        repo.save_all_pages(&[
            PageRecord::fetched(id, "/".to_string(), 200, "x".to_string()),
            PageRecord::failed(id, "/b".to_string(), Some(500), "HTTP 500".to_string()),
        ])
        .unwrap();
        repo.update_job_status(id, SiteStatus::Indexed, None).unwrap();

        let stats = load_statistics(&repo).unwrap();
        assert_eq!(stats.sites.len(), 1);
        assert_eq!(stats.sites[0].status, SiteStatus::Indexed);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.failed_pages, 1);
    }
}
