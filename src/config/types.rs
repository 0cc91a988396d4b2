use serde::Deserialize;

/// Main configuration structure for Site-Indexer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Crawl engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent page fetches per site
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Maximum number of page records persisted in one batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// How many times a failed batch write is retried before it is dropped
    #[serde(rename = "max-save-retries", default = "default_max_save_retries")]
    pub max_save_retries: u32,

    /// Initial delay between batch write retries (milliseconds, doubles each attempt)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Time in-flight tasks get to wind down after a stop before they are aborted (milliseconds)
    #[serde(rename = "stop-grace-period-ms", default = "default_stop_grace_period_ms")]
    pub stop_grace_period_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            batch_size: default_batch_size(),
            max_save_retries: default_max_save_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            stop_grace_period_ms: default_stop_grace_period_ms(),
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_batch_size() -> usize {
    50
}

fn default_max_save_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_stop_grace_period_ms() -> u64 {
    2000
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    #[serde(default)]
    pub referrer: Option<String>,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A site to index
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Site root URL
    pub url: String,

    /// Human readable site name
    pub name: String,
}
