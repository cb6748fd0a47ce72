use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

/// Run one async job per item with at most `max_concurrency` jobs in flight.
///
/// Jobs acquire their permit in input order, so dispatch order matches the
/// input even though completion order does not. The returned vector is
/// positionally aligned with `items`.
///
/// # Arguments
///
/// * `items` - Work items, one job each
/// * `max_concurrency` - Maximum number of concurrent jobs (0 is treated as 1)
/// * `job` - Builds the future for one item; receives the item's index
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, max_concurrency: usize, job: F) -> Vec<R>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let fut = job(idx, item);

        futs.push(async move {
            // The semaphore is local and never closed, so acquire cannot fail.
            let _permit = sem.acquire_owned().await.ok();
            (idx, fut.await)
        });
    }

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

    while let Some((idx, result)) = futs.next().await {
        slots[idx] = Some(result);
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_keep_input_order() {
        // Later items finish first.
        let out = run_bounded(vec![30u64, 20, 10, 0], 4, |idx, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            idx * 10
        })
        .await;
        assert_eq!(out, vec![0, 10, 20, 30]);
    }

    #[tokio::test]
    async fn never_exceeds_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = run_bounded((0..12).collect::<Vec<_>>(), 3, |_, n| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n
            }
        })
        .await;

        assert_eq!(out.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_ceiling_still_makes_progress() {
        let out = run_bounded(vec!["a", "b"], 0, |_, s| async move { s.len() }).await;
        assert_eq!(out, vec![1, 1]);
    }
}
