//! Queue between crawl tasks and the page saver

use crate::storage::PageRecord;
use tokio::sync::mpsc;

/// Creates a connected buffer / drain pair for one job
pub fn page_buffer() -> (PageBuffer, PageDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PageBuffer { tx }, PageDrain { rx })
}

/// Writing half, cloned into every crawl task of a job
///
/// Enqueueing never blocks.
#[derive(Debug, Clone)]
pub struct PageBuffer {
    tx: mpsc::UnboundedSender<PageRecord>,
}

impl PageBuffer {
    /// Enqueues a record; returns false if the drain is gone
    pub fn push(&self, record: PageRecord) -> bool {
        self.tx.send(record).is_ok()
    }
}

/// Reading half, owned by the page saver
#[derive(Debug)]
pub struct PageDrain {
    rx: mpsc::UnboundedReceiver<PageRecord>,
}

impl PageDrain {
    /// Waits for records and takes up to `max` of them
    ///
    /// Returns `None` only once every [`PageBuffer`] has been dropped and the
    /// queue is empty, so the last batch is always observed before the end.
    pub async fn next_batch(&mut self, max: usize) -> Option<Vec<PageRecord>> {
        let max = max.max(1);
        let mut batch = Vec::with_capacity(max);
        if self.rx.recv_many(&mut batch, max).await == 0 {
            None
        } else {
            Some(batch)
        }
    }
}
