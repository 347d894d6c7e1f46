//! Bounded-concurrency, cancellable batch runner
//!
//! Items are processed in fixed-size slices. Every operation in a slice runs
//! concurrently and the whole slice is awaited before the next one starts, so
//! at most `concurrency` operations are ever in flight. The cancellation token
//! is checked once per slice boundary: a slice that has been dispatched always
//! runs to completion and reports.
//!
//! Results and progress callbacks follow completion order, which is only
//! stable within a slice.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a batch run produced
#[derive(Debug, Clone)]
pub struct BatchOutcome<R> {
    /// Results in completion order
    pub results: Vec<R>,
    pub processed: usize,
    pub total: usize,
    /// True when cancellation stopped scheduling before every item ran
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    concurrency: usize,
}

impl BatchRunner {
    /// A concurrency of zero is treated as one
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `op` over `items`, calling `progress` with the 1-based cumulative
    /// completion index and the result of every finished item.
    pub async fn run<T, R, F, Fut, P>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        op: F,
        mut progress: P,
    ) -> BatchOutcome<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
        P: FnMut(usize, &R),
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;
        let mut remaining = items.into_iter().peekable();
        let mut slice_number = 0usize;

        while remaining.peek().is_some() {
            if cancel.is_cancelled() {
                cancelled = true;
                info!(
                    "Batch cancelled after {} of {} items ({} slices)",
                    results.len(),
                    total,
                    slice_number
                );
                break;
            }

            slice_number += 1;
            let mut in_flight: FuturesUnordered<Fut> =
                remaining.by_ref().take(self.concurrency).map(&op).collect();
            debug!("Dispatched slice {} with {} items", slice_number, in_flight.len());

            while let Some(result) = in_flight.next().await {
                progress(results.len() + 1, &result);
                results.push(result);
            }
        }

        BatchOutcome {
            processed: results.len(),
            results,
            total,
            cancelled,
        }
    }
}
