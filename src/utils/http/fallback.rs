//! Single-step fallback for HTTP operations
//!
//! No upstream call is retried in a loop. The one exception is an operation
//! that has a known alternative target (e.g. a second branch name): try the
//! primary once, and on any failure try the alternative exactly once.

use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Run `operation(primary)`; if it fails run `operation(alternative)` once.
///
/// The error of the second attempt is the one surfaced.
pub async fn try_with_fallback<K, F, Fut, T, E>(
    primary: K,
    alternative: K,
    operation: F,
) -> Result<T, E>
where
    K: Display + Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match operation(primary.clone()).await {
        Ok(result) => Ok(result),
        Err(first_error) => {
            warn!(
                "Attempt with '{}' failed ({}), falling back to '{}'",
                primary, first_error, alternative
            );
            operation(alternative).await
        }
    }
}
