//! Remote-Call Timeout
//!
//! Every completion request runs under an explicit deadline; an elapsed
//! timer maps onto the same fallback path as a thrown error, so a hung
//! remote call can never block the pipeline indefinitely.

use std::future::Future;
use std::time::Duration;

use crate::types::{LensError, Result};

/// Execute an async operation with a timeout.
///
/// Returns [`LensError::Timeout`] if the operation does not complete
/// within `timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(LensError::timeout(operation_name, timeout)),
    }
}
