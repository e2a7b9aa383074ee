//! Retry loop with exponential backoff for transient failures.

use crate::config::RetryPolicy;
use crate::error::SyncResult;
use std::future::Future;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Runs `operation` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors where [`SyncError::is_transient`](crate::SyncError::is_transient)
/// holds are retried; the last error is returned as-is.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, op_name: &str, mut operation: F) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            debug!(
                "retrying {op_name} after {:?} (attempt {}/{})",
                delay,
                attempt + 1,
                max_attempts
            );
            sleep(delay).await;
        }

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!("{op_name} succeeded on attempt {}", attempt + 1);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                warn!("{op_name} attempt {} failed: {e}", attempt + 1);
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("{op_name} failed after {max_attempts} attempts: {e}");
                } else {
                    debug!("{op_name} failed with non-retryable error: {e}");
                }
                return Err(e);
            }
        }
    }
}
