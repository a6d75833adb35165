//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::FlowError;

/// Bound a fallible future by `duration`.
///
/// Elapsing maps to [`FlowError::Timeout`], which the poll loop treats as a
/// transient failure. Transport implementations are not trusted to enforce
/// their own deadline.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, FlowError>>,
) -> Result<T, FlowError> {
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| Err(FlowError::Timeout(duration.as_millis() as u64)))
}
