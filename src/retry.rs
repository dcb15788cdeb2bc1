use crate::error::DataError;
use std::future::Future;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_SECS: u64 = 3;

/// Bounded retry with a fixed backoff, applied at the fetch boundary only.
/// Simulation code never sees transient upstream failures; after the last
/// attempt the error surfaces as `DataError::UpstreamUnavailable` and the
/// caller degrades the unit of work to a no-data skip.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Runs `operation` up to `max_attempts` times, sleeping `backoff`
    /// between attempts.
    pub async fn run<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T, DataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts => {
                    return Err(DataError::UpstreamUnavailable {
                        attempts: max_attempts,
                        message: format!("{}: {}", context, err),
                    });
                }
                Err(err) => {
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {:?}.",
                        attempt,
                        max_attempts,
                        context,
                        err,
                        self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let value = policy
            .run("flaky fetch", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("transient"))
                } else {
                    Ok(42)
                }
            })
            .await
            .expect("retry should eventually succeed");

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_into_upstream_unavailable() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run("doomed fetch", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("boom"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match result {
            Err(DataError::UpstreamUnavailable { attempts, message }) => {
                assert_eq!(attempts, 2);
                assert!(message.contains("doomed fetch"));
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}
