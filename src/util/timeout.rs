//! Timeout and cancellation helpers.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::WeaveError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, WeaveError>>,
) -> Result<T, WeaveError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(WeaveError::Timeout(duration.as_millis() as u64)),
    }
}

/// Race a future against a cancellation token; cancellation wins ties.
pub async fn with_cancel<T>(
    token: Option<&CancellationToken>,
    future: impl Future<Output = Result<T, WeaveError>>,
) -> Result<T, WeaveError> {
    let Some(token) = token else {
        return future.await;
    };
    if token.is_cancelled() {
        return Err(WeaveError::Canceled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(WeaveError::Canceled),
        result = future => result,
    }
}
