//! Crawler module for site indexing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`FetchClient`] capability
//! - HTML parsing and link extraction
//! - Recursive fork-join crawl tasks sharing a per-site visited set
//! - Background page persistence with bounded retries
//! - Run coordination (start, stop, job finalization)

mod buffer;
mod coordinator;
mod fetcher;
mod monitor;
mod parser;
mod retry;
mod saver;
mod task;
mod visited;

pub use buffer::{page_buffer, PageBuffer, PageDrain};
pub use coordinator::{Coordinator, IndexingError, STOPPED_BY_USER};
pub use fetcher::{build_http_client, FetchClient, FetchError, FetchedPage, HttpFetcher};
pub use monitor::{format_elapsed, SiteOutcome};
pub use parser::extract_links;
pub use retry::RetryPolicy;
pub use saver::{PageSaver, SaverStats};
pub use task::{crawl_page, CrawlError, JobContext};
pub use visited::VisitedSet;
