//! Deadlines for store calls.

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Default deadline for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Awaits `fut` for at most `limit`.
///
/// A timeout becomes [`AppError::StoreUnavailable`], never a "not found".
/// Dropping the future on timeout cancels the in-flight query.
pub async fn with_deadline<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = limit.as_millis() as u64;
            tracing::warn!(op, timeout_ms, "Store call timed out");
            Err(AppError::store_unavailable(format!(
                "{op} timed out after {timeout_ms}ms"
            )))
        }
    }
}
