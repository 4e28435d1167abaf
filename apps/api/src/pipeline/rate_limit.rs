//! Token-bucket rate limiter shared by every classifier worker in a run.
//!
//! Tokens refill continuously at `per_second`; the bucket holds at most
//! `burst` tokens. `acquire` waits until a token is available. Timing uses
//! `tokio::time` so paused-clock tests run instantly.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::MIN_RATE_PER_SEC;

/// Longest single wait between refill checks.
const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct RateLimiter {
    per_second: f64,
    burst: f64,
    state: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    /// Rates below `MIN_RATE_PER_SEC` (and NaN) are raised to it; `burst` is
    /// clamped to at least one token.
    pub fn new(per_second: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        let per_second = if per_second.is_nan() {
            MIN_RATE_PER_SEC
        } else {
            per_second.max(MIN_RATE_PER_SEC)
        };
        Self {
            per_second,
            burst,
            state: Mutex::new(Bucket {
                tokens: burst,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Waits for and consumes one token.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.burst);
                bucket.refilled_at = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::try_from_secs_f64((1.0 - bucket.tokens) / self.per_second)
                    .map_or(MAX_WAIT, |wait| wait.min(MAX_WAIT))
            };
            tokio::time::sleep(wait).await;
        }
    }
}
