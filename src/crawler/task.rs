//! Recursive fork-join crawl task
//!
//! Every page is handled by one task: it claims the URL, fetches it, hands the
//! record to the job's [`PageBuffer`] and forks one child task per unvisited
//! same-site link. A task completes only after all of its children did, so the
//! root task completing means the whole reachable site has been resolved.

use crate::crawler::buffer::PageBuffer;
use crate::crawler::fetcher::FetchClient;
use crate::crawler::parser::extract_links;
use crate::crawler::visited::VisitedSet;
use crate::storage::PageRecord;
use crate::url::{ScopedUrl, SiteScope};
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Failure that aborts a job's crawl
///
/// Fetch failures are not crawl errors; they are recorded per page.
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("crawl task panicked: {0}")]
    Panicked(String),
}

impl CrawlError {
    /// Converts a failed join into a crawl error
    ///
    /// Returns `None` for tasks that were aborted, which is how a forced stop
    /// shows up.
    pub fn from_join_error(err: JoinError) -> Option<Self> {
        if err.is_panic() {
            Some(Self::Panicked(panic_message(err.into_panic())))
        } else {
            None
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Everything the tasks of one site job share
pub struct JobContext {
    pub site_id: i64,
    pub scope: SiteScope,
    pub visited: VisitedSet,
    pub buffer: PageBuffer,
    pub fetcher: Arc<dyn FetchClient>,
    pub cancel: CancellationToken,
    permits: Semaphore,
    interrupted: AtomicBool,
}

impl JobContext {
    /// `parallelism` bounds how many fetches of this job run at once
    pub fn new(
        site_id: i64,
        scope: SiteScope,
        buffer: PageBuffer,
        fetcher: Arc<dyn FetchClient>,
        cancel: CancellationToken,
        parallelism: usize,
    ) -> Self {
        Self {
            site_id,
            scope,
            visited: VisitedSet::new(),
            buffer,
            fetcher,
            cancel,
            permits: Semaphore::new(parallelism.max(1)),
            interrupted: AtomicBool::new(false),
        }
    }

    /// Returns true if cancellation made any task skip or discard work
    ///
    /// A crawl that finished everything before the stop arrived reports false.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }
}

/// Crawls `url` and everything reachable from it
///
/// The returned future resolves once the whole subtree is done. The first
/// fatal error of any descendant is returned and aborts the remaining
/// siblings of the subtree that raised it.
pub fn crawl_page(ctx: Arc<JobContext>, url: Url) -> BoxFuture<'static, Result<(), CrawlError>> {
    async move {
        if ctx.cancel.is_cancelled() {
            ctx.interrupt();
            return Ok(());
        }

        let Some(ScopedUrl { key, target }) = ctx.scope.admit(url) else {
            return Ok(());
        };

        if !ctx.visited.insert(&key) {
            return Ok(());
        }

        let fetched = {
            let _permit = tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    ctx.interrupt();
                    return Ok(());
                }
                permit = ctx.permits.acquire() => match permit {
                    Ok(permit) => permit,
                    // the job's semaphore is never closed
                    Err(_) => return Ok(()),
                },
            };
            ctx.fetcher.fetch(&target).await
        };

        // results that arrive after a stop are discarded
        if ctx.cancel.is_cancelled() {
            tracing::debug!("Discarding {} fetched after stop", target);
            ctx.interrupt();
            return Ok(());
        }

        let path = ctx.scope.relative_path(&key);
        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("Failed to fetch {}: {}", target, e);
                ctx.buffer.push(PageRecord::failed(
                    ctx.site_id,
                    path,
                    e.status_code(),
                    e.to_string(),
                ));
                return Ok(());
            }
        };

        let links = extract_links(&page.content, &page.final_url, &ctx.scope);
        ctx.buffer.push(PageRecord::fetched(
            ctx.site_id,
            path,
            page.status_code,
            page.content,
        ));

        let mut children = JoinSet::new();
        for link in links {
            if !ctx.visited.contains(&link.key) {
                children.spawn(crawl_page(Arc::clone(&ctx), link.target));
            }
        }
        drop(ctx);

        join_children(children).await
    }
    .boxed()
}

async fn join_children(mut children: JoinSet<Result<(), CrawlError>>) -> Result<(), CrawlError> {
    while let Some(joined) = children.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            // dropping `children` aborts the siblings still running
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                if let Some(fatal) = CrawlError::from_join_error(e) {
                    return Err(fatal);
                }
            }
        }
    }
    Ok(())
}
