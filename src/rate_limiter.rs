use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Key shared by every client that could not be identified.
pub const ANONYMOUS_KEY: &str = "anonymous";

const DEFAULT_LIMIT: u32 = 1;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Per-key request counter for the current window
#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// Fixed-window rate limiter keyed by client identity.
///
/// Every key gets `limit` requests per `window`. The counter resets entirely
/// once the window has elapsed, so up to `2 * limit` requests can be admitted
/// across a window boundary.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl FixedWindowLimiter {
    /// Non-positive limits and zero windows fall back to one request per minute.
    pub fn new(limit: i64, window: Duration) -> Self {
        let limit = if limit <= 0 {
            DEFAULT_LIMIT
        } else {
            u32::try_from(limit).unwrap_or(u32::MAX)
        };
        let window = if window.is_zero() { DEFAULT_WINDOW } else { window };

        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `key` at `now` and report whether it is admitted.
    pub fn allow(&self, key: &str, now: Instant) -> bool {
        let key = if key.trim().is_empty() { ANONYMOUS_KEY } else { key };

        let mut buckets = self.lock();

        match buckets.get_mut(key) {
            Some(bucket) if now.saturating_duration_since(bucket.window_start) < self.window => {
                if bucket.count >= self.limit {
                    return false;
                }
                bucket.count += 1;
                true
            }
            _ => {
                buckets.insert(
                    key.to_string(),
                    Bucket {
                        window_start: now,
                        count: 1,
                    },
                );
                self.sweep(&mut buckets, now);
                true
            }
        }
    }

    /// Number of keys currently tracked
    pub fn bucket_count(&self) -> usize {
        self.lock().len()
    }

    fn sweep(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        let max_age = self.window.saturating_mul(2);
        let before = buckets.len();

        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < max_age);

        let removed = before - buckets.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = buckets.len(), "swept stale rate limit buckets");
        }
    }

    // A panic while holding the lock cannot leave a bucket half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
