//! Per-call deadline enforcement.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use visage_core::{UpstreamError, UpstreamResult};

/// Run `operation` under a deadline of `budget`.
///
/// The operation receives a [`CancellationToken`]. If the deadline elapses
/// first, the token is cancelled (best-effort cooperative cancellation for
/// any work the operation detached), the operation's future is dropped, and
/// the guard fails with [`UpstreamError::Timeout`]. A result produced before
/// the deadline passes through untouched; the timer is dropped with the
/// deadline future, so it can never fire late.
///
/// Detached work that ignores the token keeps running in the background; its
/// result is discarded.
pub async fn with_timeout<T, Op, Fut>(budget: Duration, operation: Op) -> UpstreamResult<T>
where
    Op: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = UpstreamResult<T>>,
{
    let cancel = CancellationToken::new();
    match tokio::time::timeout(budget, operation(cancel.clone())).await {
        Ok(result) => result,
        Err(_elapsed) => {
            cancel.cancel();
            Err(UpstreamError::Timeout { budget })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn slow_operation_times_out() {
        let result: UpstreamResult<()> = with_timeout(Duration::from_millis(20), |_cancel| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Timeout { .. })));
    }

    #[tokio::test]
    async fn fast_operation_passes_through_success() {
        let result = with_timeout(Duration::from_millis(200), |_cancel| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, UpstreamError>("done")
        })
        .await;

        assert_eq!(result.unwrap(), "done");

        // The deadline must not fire after the fact.
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    #[tokio::test]
    async fn fast_operation_passes_through_its_own_error() {
        let result: UpstreamResult<()> = with_timeout(Duration::from_millis(200), |_cancel| async {
            Err(UpstreamError::from_status(502, "bad gateway"))
        })
        .await;

        // The operation's own failure wins over any timeout mapping.
        assert!(matches!(result, Err(UpstreamError::Service { status: 502, .. })));
    }

    #[tokio::test]
    async fn cancellation_is_signalled_to_detached_work() {
        let aborted = Arc::new(AtomicBool::new(false));
        let aborted_clone = aborted.clone();

        let result: UpstreamResult<()> = with_timeout(Duration::from_millis(20), move |cancel| {
            // Model an operation that hands its token to detached I/O.
            let inner = tokio::spawn(async move {
                cancel.cancelled().await;
                aborted_clone.store(true, Ordering::SeqCst);
            });
            async move {
                let _ = inner.await;
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(UpstreamError::Timeout { .. })));

        // Give the detached task a moment to observe the cancellation.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(aborted.load(Ordering::SeqCst), "token was never cancelled");
    }

    #[tokio::test]
    async fn token_is_not_cancelled_on_success() {
        let token_probe = Arc::new(std::sync::Mutex::new(None::<CancellationToken>));
        let probe_clone = token_probe.clone();

        let result = with_timeout(Duration::from_millis(200), move |cancel| async move {
            *probe_clone.lock().unwrap() = Some(cancel);
            Ok::<_, UpstreamError>(())
        })
        .await;

        assert!(result.is_ok());
        let token = token_probe.lock().unwrap().take().unwrap();
        assert!(!token.is_cancelled());
    }
}
