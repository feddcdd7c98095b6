use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::debug;

/// Runs work in fixed-width concurrent batches.
///
/// Every task of a batch completes before the next batch starts, and `pause`
/// is slept between batches (never after the last). Output order matches input
/// order.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    width: usize,
    pause: Duration,
}

impl BatchScheduler {
    pub fn new(width: usize, pause: Duration) -> Self {
        Self {
            width: width.max(1),
            pause,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, mut task: F) -> Vec<T>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let total = items.len();
        let mut out = Vec::with_capacity(total);
        let mut remaining = items.into_iter().peekable();
        let mut batch_no = 0usize;

        while remaining.peek().is_some() {
            let batch: Vec<Fut> = remaining.by_ref().take(self.width).map(&mut task).collect();
            batch_no += 1;
            debug!(batch = batch_no, size = batch.len(), total, "[SCHEDULER] batch start");
            out.extend(join_all(batch).await);

            if remaining.peek().is_some() && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        out
    }
}
