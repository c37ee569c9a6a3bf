use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::error::ExecutorError;
use crate::graph::WorkItem;

use super::types::ItemOutcome;

/// Execute one wave's items with at most `max_concurrency` in flight.
///
/// Returns once every worker has produced an outcome; outcomes are in
/// completion order. A failing item never cancels its siblings.
pub async fn execute_wave_parallel<F, Fut>(
    items: Vec<WorkItem>,
    max_concurrency: usize,
    worker_fn: F,
) -> Result<Vec<ItemOutcome>, ExecutorError>
where
    F: Fn(WorkItem) -> Fut + Clone + Send + 'static,
    Fut: std::future::Future<Output = ItemOutcome> + Send,
{
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for item in items {
        let sem = sem.clone();
        let worker = worker_fn.clone();

        futs.push(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|_| ExecutorError::Runner("semaphore closed unexpectedly".into()))?;

            Ok::<_, ExecutorError>(worker(item).await)
        });
    }

    let mut outcomes = Vec::with_capacity(futs.len());
    while let Some(res) = futs.next().await {
        outcomes.push(res?);
    }

    Ok(outcomes)
}
