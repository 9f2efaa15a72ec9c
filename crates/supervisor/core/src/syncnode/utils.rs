use crate::syncnode::ManagedNodeError;
use backon::{ExponentialBuilder, Retryable};
use std::{future::Future, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Spawns `task`, restarting it with exponential backoff each time it fails, until it
/// succeeds, runs out of retries or `cancel_token` is cancelled.
pub(super) fn spawn_task_with_retry<F, Fut>(
    task: F,
    cancel_token: CancellationToken,
    max_retries: usize,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ManagedNodeError>> + Send + 'static,
{
    tokio::spawn(async move {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_max_times(max_retries)
            .with_jitter();

        let retried = task.retry(backoff).notify(|err: &ManagedNodeError, after: Duration| {
            warn!(target: "supervisor::syncnode", %err, ?after, "Task failed, retrying");
        });

        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!(target: "supervisor::syncnode", "Cancellation requested, stopping task");
            }
            result = retried => {
                if let Err(err) = result {
                    error!(target: "supervisor::syncnode", %err, "Task failed, giving up");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test(start_paused = true)]
    async fn test_task_is_retried_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let handle = spawn_task_with_retry(
            {
                let attempts = attempts.clone();
                move || {
                    let attempts = attempts.clone();
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                            return Err(ManagedNodeError::SubscriptionClosed);
                        }
                        Ok(())
                    }
                }
            },
            CancellationToken::new(),
            usize::MAX,
        );

        handle.await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_stops_on_cancellation() {
        let cancel_token = CancellationToken::new();
        let handle = spawn_task_with_retry(
            || async { Err(ManagedNodeError::SubscriptionClosed) },
            cancel_token.clone(),
            usize::MAX,
        );

        cancel_token.cancel();
        handle.await.unwrap();
    }
}
