use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket allowing `max_rate` acquisitions per `time_period`
/// seconds, matching the rate-limit parameters of an LLM record.
pub struct RateLimiter {
    capacity: f64,
    period: Duration,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(max_rate: f64, time_period_secs: f64) -> Self {
        let capacity = max_rate.max(1.0);
        let period = Duration::from_secs_f64(time_period_secs.max(0.001));
        Self {
            capacity,
            period,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a request slot is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.last_refill.elapsed();
                let refill = elapsed.as_secs_f64() / self.period.as_secs_f64() * self.capacity;
                state.tokens = (state.tokens + refill).min(self.capacity);
                state.last_refill = Instant::now();

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.capacity * self.period.as_secs_f64())
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_within_capacity_is_immediate() {
        let limiter = RateLimiter::new(5.0, 1.0);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_exhausted_bucket_waits_for_refill() {
        let limiter = RateLimiter::new(2.0, 0.2);
        limiter.acquire().await;
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        // Third slot needs roughly half the period to refill.
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
