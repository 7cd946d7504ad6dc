//! Deadline guard for async operations.

use std::future::Future;
use std::time::Duration;

use crate::{Error, Result};

/// Runs `operation` with a deadline.
///
/// The timer lives inside the returned future and is dropped on every exit
/// path. On expiry the operation is dropped, not driven to completion.
///
/// # Errors
///
/// Returns the operation's own error, or [`Error::Timeout`] naming `name`.
pub async fn with_timeout<F, T>(name: &'static str, limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: name,
            after: limit,
        }),
    }
}

/// Runs `operation` with a deadline when one is given.
pub(crate) async fn with_optional_timeout<F, T>(
    name: &'static str,
    limit: Option<Duration>,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => with_timeout(name, limit, operation).await,
        None => operation.await,
    }
}
