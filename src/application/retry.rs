// Retry and reconnect policies
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent. The last
    /// error is returned on exhaustion; there is no delay after the final attempt.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(
                        what,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(what, attempts = attempt, error = %e, "retry budget exhausted");
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Exponential reconnect delay, reset once a connection succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Backoff {
    pub fn delays(&self) -> BackoffDelays {
        BackoffDelays {
            policy: *self,
            next: self.initial,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackoffDelays {
    policy: Backoff,
    next: Duration,
}

impl BackoffDelays {
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next.min(self.policy.max);
        self.next = current
            .saturating_mul(self.policy.factor.max(1))
            .min(self.policy.max);
        current
    }

    pub fn reset(&mut self) {
        self.next = self.policy.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u32, String> = RetryPolicy::default()
            .run("test", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::default()
            .run("test", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n}"))
            })
            .await;

        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let mut delays = Backoff::default().delays();
        let seen: Vec<u64> = (0..7).map(|_| delays.next_delay().as_secs()).collect();
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 30, 30]);

        delays.reset();
        assert_eq!(delays.next_delay(), Duration::from_secs(1));
    }
}
