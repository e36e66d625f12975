//! Helpers for retry decisions made inside reply handlers.
//!
//! Replies never retry on their own. A failure or error handler decides and
//! calls `retry()` or `retry_after(delay)`:
//!
//! ```ignore
//! let handle = reply.clone();
//! reply.on_failed(move |status, _| {
//!     let attempt = handle.reply().attempts();
//!     if is_retryable_status(status) && attempt < 4 {
//!         handle.retry_after(exponential_backoff(attempt, 100));
//!     }
//! });
//! ```

use std::time::Duration;

/// Check if status code indicates a transient server condition
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 502 | 503 | 504)
}

/// Check if status code indicates access denied
pub fn is_access_denied_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Exponential backoff delay: `base_ms * 2^attempt`, with the exponent capped at 10.
pub fn exponential_backoff(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2_u64.pow(attempt.min(10)));
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(500));
    }

    #[test]
    fn test_is_access_denied_status() {
        assert!(is_access_denied_status(401));
        assert!(!is_access_denied_status(404));
    }

    #[test]
    fn test_exponential_backoff() {
        assert_eq!(exponential_backoff(0, 100), Duration::from_millis(100));
        assert_eq!(exponential_backoff(2, 100), Duration::from_millis(400));
        assert_eq!(exponential_backoff(40, 1), Duration::from_millis(1024));
    }
}
