//! Time-bounded retry with exponential backoff.
//!
//! kubectl failures are frequently transient: the API server blips, an
//! optimistic-lock conflict, a namespace that is not visible yet. Each
//! lifecycle step keeps retrying until its own timeout elapses.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::{Duration, Instant};

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an attempt failed and another one is scheduled.
    ///
    /// # Arguments
    /// * `operation` - Name of the operation being retried
    /// * `attempt` - Number of the attempt that failed (1-indexed)
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until the next attempt
    fn on_retry(&self, operation: &str, attempt: u32, error: &Error, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _operation: &str, _attempt: u32, _error: &Error, _delay: Duration) {}
}

/// Callback that logs retries at `warn` level.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, operation: &str, attempt: u32, error: &Error, delay: Duration) {
        log::warn!(
            "{operation}: attempt {attempt} failed: {error}. Retrying in {}ms...",
            delay.as_millis()
        );
    }
}

/// Execute an operation until it succeeds or `config.timeout` elapses.
///
/// Retryable errors are retried with exponential backoff. Errors that are
/// not retryable are returned immediately. When the timeout elapses the
/// last attempt's error is returned as is.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    operation_name: &str,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempt: u32 = 0;

    loop {
        let error = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !error.is_retryable() {
            return Err(error);
        }

        let now = Instant::now();
        if now >= deadline {
            log::error!(
                "{operation_name}: giving up after {} attempts: {error}",
                attempt + 1
            );
            return Err(error);
        }

        let delay = config
            .delay_for_attempt(attempt)
            .min(deadline.saturating_duration_since(now));

        if let Some(cb) = callback {
            cb.on_retry(operation_name, attempt + 1, &error, delay);
        }

        thread::sleep(delay);
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fast(timeout: Duration) -> RetryConfig {
        RetryConfig {
            timeout,
            base_delay: Duration::from_millis(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(5),
        }
    }

    fn transient() -> Error {
        Error::Execution {
            command: "kubectl apply -f -".to_string(),
            stderr: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_success_first_try() {
        let result = with_retry(&fast(Duration::from_secs(1)), "op", None, || {
            Ok::<_, Error>(42)
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_eventual_success_after_n_failures() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&fast(Duration::from_secs(5)), "op", None, || {
            let current = attempts_clone.get();
            attempts_clone.set(current + 1);
            if current < 3 { Err(transient()) } else { Ok(7) }
        });

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.get(), 4);
    }

    #[test]
    fn test_always_failing_gives_up_after_timeout() {
        let attempts = Rc::new(Cell::new(0u32));
        let attempts_clone = attempts.clone();
        let timeout = Duration::from_millis(50);
        let started = Instant::now();

        let result: Result<()> = with_retry(&fast(timeout), "op", None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::Execution {
                command: "kubectl".to_string(),
                stderr: format!("attempt {}", attempts_clone.get()),
            })
        });

        assert!(started.elapsed() >= timeout);
        assert!(attempts.get() > 1);
        match result.unwrap_err() {
            Error::Execution { stderr, .. } => {
                assert_eq!(stderr, format!("attempt {}", attempts.get()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_retryable_error_returns_immediately() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&fast(Duration::from_secs(5)), "op", None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::Cardinality { count: 2 })
        });

        assert!(matches!(result, Err(Error::Cardinality { count: 2 })));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_zero_timeout_makes_one_attempt() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&fast(Duration::ZERO), "op", None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(transient())
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_callback_invoked_per_retry() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingCallback(Arc<AtomicU32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: &str, _: u32, _: &Error, _: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let count = Arc::new(AtomicU32::new(0));
        let callback = CountingCallback(count.clone());
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let _ = with_retry(&fast(Duration::from_secs(5)), "op", Some(&callback), || {
            let current = attempts_clone.get();
            attempts_clone.set(current + 1);
            if current < 2 { Err(transient()) } else { Ok(()) }
        });

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
