use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, future::retry};
use tracing::warn;

use crate::error::{PlaygroundError, Result};

/// Runs `operation` until it succeeds, fails permanently, or the backoff
/// budget is spent.
pub async fn execute_with_retry<F, Fut, T>(operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, backoff::Error<PlaygroundError>>>,
{
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..Default::default()
    };

    retry(backoff, operation).await
}

pub fn transient_error(err: PlaygroundError) -> backoff::Error<PlaygroundError> {
    warn!("Transient error encountered, retrying: {}", err);
    backoff::Error::transient(err)
}

pub fn permanent_error(err: PlaygroundError) -> backoff::Error<PlaygroundError> {
    backoff::Error::permanent(err)
}

pub fn wrap_error(err: PlaygroundError) -> backoff::Error<PlaygroundError> {
    if err.is_transient() {
        transient_error(err)
    } else {
        permanent_error(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicUsize::new(0);
        let value = execute_with_retry(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(wrap_error(PlaygroundError::ConnectionError("refused".into())))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let res: Result<()> = execute_with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(wrap_error(PlaygroundError::ExtractionError("bad".into())))
        })
        .await;

        assert!(matches!(res, Err(PlaygroundError::ExtractionError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
