//! # Backoff
//!
//! Two retry layers sit between a failing reconciliation and the API server:
//!
//! - [`RequeueLimiter`] decides when a failed resource key is requeued. It
//!   combines a per-key exponential backoff (5ms doubling up to 1000s) with
//!   a global token bucket (10 qps, burst 100) and uses whichever delay is
//!   longer.
//! - [`retry_on_conflict`] retries an optimistic-concurrency write a
//!   bounded number of times, and only for [`StoreError::Conflict`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::store::StoreError;

#[derive(Debug)]
struct LimiterState {
    failures: HashMap<String, u32>,
    tokens: f64,
    last_refill: Instant,
}

/// Rate limiter for requeues of failed resource keys
#[derive(Debug)]
pub struct RequeueLimiter {
    base_delay: Duration,
    max_delay: Duration,
    qps: f64,
    burst: f64,
    state: Mutex<LimiterState>,
}

impl Default for RequeueLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_secs(1000), 10.0, 100)
    }
}

impl RequeueLimiter {
    pub fn new(base_delay: Duration, max_delay: Duration, qps: f64, burst: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            qps,
            burst: f64::from(burst),
            state: Mutex::new(LimiterState {
                failures: HashMap::new(),
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LimiterState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Delay before `key` may be reconciled again after a failure.
    /// Every call counts as one more failure of `key`.
    pub fn when(&self, key: &str) -> Duration {
        let mut state = self.lock();

        let failures = state.failures.entry(key.to_string()).or_insert(0);
        let exponent = (*failures).min(63);
        *failures = failures.saturating_add(1);
        let item_delay = self
            .base_delay
            .checked_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX))
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;
        state.tokens = (state.tokens + elapsed * self.qps).min(self.burst) - 1.0;
        let bucket_delay = if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.qps)
        };

        item_delay.max(bucket_delay)
    }

    /// Clear the failure history of `key` after a successful pass
    pub fn forget(&self, key: &str) {
        self.lock().failures.remove(key);
    }

    /// Failures recorded for `key` since the last success
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.lock().failures.get(key).copied().unwrap_or(0)
    }
}

/// Bounded exponential backoff for optimistic-concurrency retries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConflictBackoff {
    /// Total attempts, including the first
    pub steps: u32,
    pub duration: Duration,
    pub factor: f64,
    /// Each delay is extended by up to `jitter * delay`
    pub jitter: f64,
}

impl Default for ConflictBackoff {
    fn default() -> Self {
        Self {
            steps: 4,
            duration: Duration::from_millis(10),
            factor: 5.0,
            jitter: 0.1,
        }
    }
}

impl ConflictBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.duration.as_secs_f64() * self.factor.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let jitter = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..=self.jitter)
        } else {
            0.0
        };
        Duration::from_secs_f64(base * (1.0 + jitter))
    }
}

/// Run `operation` until it succeeds, fails with a non-conflict error, or
/// the backoff is exhausted. The operation must re-read the object it
/// writes so each attempt works on the latest resourceVersion.
pub async fn retry_on_conflict<T, F, Fut>(backoff: ConflictBackoff, mut operation: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Err(StoreError::Conflict(message)) if attempt + 1 < backoff.steps => {
                let delay = backoff.delay(attempt);
                debug!("Write conflict ({}), retrying in {:?}", message, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
