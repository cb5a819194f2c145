//! Minimum-interval rate limiter shared between request paths.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Rate limiter that enforces a maximum request rate.
///
/// Clones share the same budget, so one limiter handed to several workers
/// caps their combined rate. The lock is held across the wait, which keeps
/// waiters in FIFO order.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

#[derive(Debug)]
struct RateLimiterInner {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given maximum requests per second.
    pub fn new(max_per_second: f64) -> Self {
        let min_interval = if max_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / max_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                min_interval,
                last_request: None,
            })),
        }
    }

    /// Wait until a request is allowed, then mark it as sent.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(last) = inner.last_request {
            let elapsed = last.elapsed();
            if elapsed < inner.min_interval {
                tokio::time::sleep(inner.min_interval - elapsed).await;
            }
        }

        inner.last_request = Some(Instant::now());
    }
}
