//! Integration tests for the indexer
//!
//! These tests use wiremock to create mock HTTP servers and drive full
//! indexing runs end-to-end through the real HTTP fetcher and SQLite storage.

use site_indexer::config::{Config, CrawlerConfig, FetchConfig, OutputConfig, SiteEntry};
use site_indexer::crawler::{Coordinator, HttpFetcher, IndexingError, STOPPED_BY_USER};
use site_indexer::state::{IndexingStatus, SiteStatus};
use site_indexer::storage::{Repository, SqliteRepository};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Upper bound for any run in these tests
const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// Creates a test configuration indexing the given site roots
fn create_test_config(roots: &[String], db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            parallelism: 4,
            batch_size: 10,
            max_save_retries: 1,
            retry_delay_ms: 10,
            stop_grace_period_ms: 500,
        },
        fetch: FetchConfig {
            user_agent: "TestBot/1.0".to_string(),
            referrer: Some("https://www.google.com".to_string()),
            timeout_secs: 5,
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        sites: roots
            .iter()
            .enumerate()
            .map(|(i, url)| SiteEntry {
                url: url.clone(),
                name: format!("Test site {}", i),
            })
            .collect(),
    }
}

fn html_page(links: &[&str]) -> ResponseTemplate {
    let body = links
        .iter()
        .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
        .collect::<String>();
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html_page(links))
        .expect(1)
        .mount(server)
        .await;
}

fn coordinator(config: &Config) -> (Coordinator, Arc<SqliteRepository>) {
    let repo = Arc::new(SqliteRepository::new_in_memory().expect("in-memory database"));
    let fetcher = HttpFetcher::new(&config.fetch).expect("http client");
    let coordinator = Coordinator::new(config, repo.clone(), Arc::new(fetcher));
    (coordinator, repo)
}

async fn run_to_completion(coordinator: &Coordinator) {
    coordinator
        .start_indexing()
        .await
        .expect("indexing should start");
    tokio::time::timeout(RUN_TIMEOUT, coordinator.wait_until_stopped())
        .await
        .expect("run should finish");
}

#[tokio::test]
async fn test_cycle_fetches_each_page_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/b", "/c"]).await;
    mount_page(&server, "/b", &["/"]).await;
    mount_page(&server, "/c", &[]).await;

    let config = create_test_config(&[server.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    run_to_completion(&coordinator).await;

    let job = repo
        .get_site_job_by_url(&format!("{}/", server.uri()))
        .unwrap()
        .expect("job should exist");
    assert_eq!(job.status, SiteStatus::Indexed);
    assert!(job.last_error.is_none());

    let pages = repo.get_pages(job.id).unwrap();
    let paths: Vec<_> = pages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/b", "/c"]);
    assert!(pages.iter().all(|p| p.code == Some(200) && p.content.is_some()));
}

#[tokio::test]
async fn test_failed_page_is_recorded_and_not_followed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/b", "/c"]).await;
    mount_page(&server, "/c", &[]).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&[server.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    run_to_completion(&coordinator).await;

    let job = repo
        .get_site_job_by_url(&format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(job.status, SiteStatus::Indexed);

    let pages = repo.get_pages(job.id).unwrap();
    assert_eq!(pages.len(), 3);

    let failed = pages.iter().find(|p| p.path == "/b").unwrap();
    assert!(failed.is_failed());
    assert_eq!(failed.code, Some(500));
    assert!(failed.content.is_none());
    assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
}

#[tokio::test]
async fn test_every_discovered_page_is_persisted() {
    let server = MockServer::start().await;

    // binary tree of 31 pages, every page also links back to the root
    for n in 0..31usize {
        let page = if n == 0 { "/".to_string() } else { format!("/p{}", n) };
        let children: Vec<String> = [2 * n + 1, 2 * n + 2]
            .into_iter()
            .filter(|c| *c < 31)
            .map(|c| format!("/p{}", c))
            .chain(std::iter::once("/".to_string()))
            .collect();
        let links: Vec<&str> = children.iter().map(String::as_str).collect();
        mount_page(&server, &page, &links).await;
    }

    let config = create_test_config(&[server.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    run_to_completion(&coordinator).await;

    let job = repo
        .get_site_job_by_url(&format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(job.status, SiteStatus::Indexed);
    assert_eq!(repo.get_pages(job.id).unwrap().len(), 31);
    assert_eq!(coordinator.dropped_pages(), 0);
}

#[tokio::test]
async fn test_sites_are_indexed_independently() {
    let healthy = MockServer::start().await;
    mount_page(&healthy, "/", &["/a"]).await;
    mount_page(&healthy, "/a", &[]).await;

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let config = create_test_config(&[healthy.uri(), broken.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    run_to_completion(&coordinator).await;

    let summaries = repo.site_summaries().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].pages, 2);
    assert_eq!(summaries[0].failed_pages, 0);
    assert_eq!(summaries[1].pages, 1);
    assert_eq!(summaries[1].failed_pages, 1);
    assert!(summaries.iter().all(|s| s.status == SiteStatus::Indexed));
}

/// Serves an endless site: page n links to pages 2n+1 and 2n+2
struct EndlessSite;

impl Respond for EndlessSite {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let n: u64 = request
            .url
            .path()
            .trim_start_matches("/p")
            .parse()
            .unwrap_or(0);
        let first = format!("/p{}", 2 * n + 1);
        let second = format!("/p{}", 2 * n + 2);
        html_page(&[&first, &second]).set_delay(Duration::from_millis(20))
    }
}

#[tokio::test]
async fn test_stop_mid_crawl_halts_large_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(EndlessSite)
        .mount(&server)
        .await;

    let config = create_test_config(&[server.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    let mut status = coordinator.subscribe();

    coordinator.start_indexing().await.unwrap();
    assert_eq!(*status.borrow_and_update(), IndexingStatus::Running);

    tokio::time::sleep(Duration::from_millis(300)).await;
    coordinator.stop_indexing().await.unwrap();

    tokio::time::timeout(RUN_TIMEOUT, coordinator.wait_until_stopped())
        .await
        .expect("stop should complete in bounded time");
    assert_eq!(*status.borrow_and_update(), IndexingStatus::Stopped);

    // Stopped is published once
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!status.has_changed().unwrap());

    let job = repo
        .get_site_job_by_url(&format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(job.status, SiteStatus::Failed);
    assert_eq!(job.last_error.as_deref(), Some(STOPPED_BY_USER));

    let pages = repo.get_pages(job.id).unwrap();
    assert!(!pages.is_empty());
    assert!(pages.iter().all(|p| !p.is_failed()));

    // nothing is written once the run is over
    let count = pages.len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(repo.get_pages(job.id).unwrap().len(), count);
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(EndlessSite)
        .mount(&server)
        .await;

    let config = create_test_config(&[server.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    let root = format!("{}/", server.uri());

    coordinator.start_indexing().await.unwrap();
    let job = repo.get_site_job_by_url(&root).unwrap().unwrap();

    let second = coordinator.start_indexing().await;
    assert!(matches!(second, Err(IndexingError::AlreadyRunning)));
    assert_eq!(coordinator.status(), IndexingStatus::Running);

    let still = repo.get_site_job_by_url(&root).unwrap().unwrap();
    assert_eq!(still.id, job.id);
    assert_eq!(still.status, SiteStatus::Indexing);

    coordinator.stop_indexing().await.unwrap();
    tokio::time::timeout(RUN_TIMEOUT, coordinator.wait_until_stopped())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stop_while_stopped_is_rejected() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &[]).await;

    let config = create_test_config(&[server.uri()], ":memory:");
    let (coordinator, repo) = coordinator(&config);

    assert!(matches!(
        coordinator.stop_indexing().await,
        Err(IndexingError::NotRunning)
    ));
    assert!(repo.site_summaries().unwrap().is_empty());

    run_to_completion(&coordinator).await;
    assert!(matches!(
        coordinator.stop_indexing().await,
        Err(IndexingError::NotRunning)
    ));

    let summaries = repo.site_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].status, SiteStatus::Indexed);
}

#[tokio::test]
async fn test_from_config_persists_to_file() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/docs/"]).await;
    mount_page(&server, "/docs/", &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("index.db");
    let config = create_test_config(&[server.uri()], db_path.to_str().unwrap());

    let coordinator = Coordinator::from_config(&config).unwrap();
    run_to_completion(&coordinator).await;
    drop(coordinator);

    let reopened = SqliteRepository::new(&db_path).unwrap();
    let job = reopened
        .get_site_job_by_url(&format!("{}/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(job.status, SiteStatus::Indexed);

    let paths: Vec<_> = reopened
        .get_pages(job.id)
        .unwrap()
        .into_iter()
        .map(|p| p.path)
        .collect();
    assert_eq!(paths, vec!["/", "/docs"]);
}

#[tokio::test]
async fn test_site_below_host_root_follows_relative_links() {
    let server = MockServer::start().await;
    mount_page(&server, "/docs/", &["intro", "guide/", "/blog"]).await;
    mount_page(&server, "/docs/intro", &["../docs/"]).await;
    mount_page(&server, "/docs/guide/", &["setup"]).await;
    mount_page(&server, "/docs/guide/setup", &[]).await;
    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(html_page(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let root = format!("{}/docs/", server.uri());
    let config = create_test_config(&[root.clone()], ":memory:");
    let (coordinator, repo) = coordinator(&config);
    run_to_completion(&coordinator).await;

    let job = repo.get_site_job_by_url(&root).unwrap().unwrap();
    assert_eq!(job.status, SiteStatus::Indexed);

    let mut paths: Vec<_> = repo
        .get_pages(job.id)
        .unwrap()
        .into_iter()
        .map(|p| p.path)
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec!["/docs", "/docs/guide", "/docs/guide/setup", "/docs/intro"]
    );
}
