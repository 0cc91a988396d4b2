//! Bounded exponential retry for blocking repository calls

use crate::config::CrawlerConfig;
use crate::storage::{StorageError, StorageResult};
use std::sync::Arc;
use std::time::Duration;

/// How often and how patiently a failed storage write is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each one
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_save_retries,
            initial_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Runs `op` on the blocking pool until it succeeds, fails permanently,
    /// or the retry budget is spent
    ///
    /// `what` names the operation in log messages.
    pub async fn run_blocking<T, F>(&self, what: &str, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        let mut delay = self.initial_delay;
        let mut attempt = 0;

        loop {
            let call = Arc::clone(&op);
            let result = tokio::task::spawn_blocking(move || call())
                .await
                .unwrap_or_else(|e| Err(StorageError::Database(format!("storage task failed: {}", e))));

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
