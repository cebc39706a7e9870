//! Per-call correlation scope.
//!
//! One inbound call gets one [`CorrelationId`]; every asynchronous
//! continuation spawned while handling that call can read it back without the
//! id being threaded through as a parameter. The scope is a tokio task-local:
//! immutable once established, copy-per-call, no locking.
//!
//! The scope does **not** cross `tokio::spawn` — detached work must re-enter
//! it explicitly (queue workers do this with the id carried on the job).

use std::future::Future;

use visage_core::CorrelationId;

tokio::task_local! {
    static CORRELATION_ID: CorrelationId;
}

/// Run `fut` inside a scope where [`current_correlation_id`] returns `id`.
pub async fn with_correlation_id<F>(id: CorrelationId, fut: F) -> F::Output
where
    F: Future,
{
    CORRELATION_ID.scope(id, fut).await
}

/// The correlation id visible in the caller's dynamic scope, or `None` when
/// called outside any scope.
pub fn current_correlation_id() -> Option<CorrelationId> {
    CORRELATION_ID.try_with(|id| id.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_outside_any_scope() {
        assert!(current_correlation_id().is_none());
    }

    #[tokio::test]
    async fn visible_through_nested_async_calls() {
        async fn leaf() -> Option<CorrelationId> {
            tokio::task::yield_now().await;
            current_correlation_id()
        }

        async fn branch() -> Option<CorrelationId> {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            leaf().await
        }

        let id = CorrelationId::from_header("call-1").unwrap();
        let seen = with_correlation_id(id.clone(), branch()).await;
        assert_eq!(seen, Some(id));
    }

    #[tokio::test]
    async fn concurrent_calls_never_observe_each_others_id() {
        async fn observe_repeatedly(expect: &str) {
            for _ in 0..25 {
                tokio::task::yield_now().await;
                let seen = current_correlation_id().expect("scope lost");
                assert_eq!(seen.as_str(), expect);
            }
        }

        let a = CorrelationId::from_header("call-a").unwrap();
        let b = CorrelationId::from_header("call-b").unwrap();

        // Interleave both logical calls on the same runtime.
        tokio::join!(
            with_correlation_id(a, observe_repeatedly("call-a")),
            with_correlation_id(b, observe_repeatedly("call-b")),
        );
    }

    #[tokio::test]
    async fn scope_ends_when_future_completes() {
        let id = CorrelationId::generate();
        with_correlation_id(id, async {
            assert!(current_correlation_id().is_some());
        })
        .await;
        assert!(current_correlation_id().is_none());
    }
}
