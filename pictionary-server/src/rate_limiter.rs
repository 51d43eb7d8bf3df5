use std::time::Duration;
use tokio::time::Instant;

/// Token bucket. A bucket of one token refilled every `interval` is a
/// minimum spacing between accepted calls.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            tokens: 30, // Start with full bucket
            max_tokens: 30, // Max 30 tokens
            refill_rate: Duration::from_millis(200), // Refill 1 token every 200ms
            last_refill: Instant::now(),
        }
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// At most one accepted call per `interval`
    pub fn min_interval(interval: Duration) -> Self {
        Self::new_with_limits(1, interval)
    }

    pub async fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let now = Instant::now();

        // The refill clock only runs while the bucket is below capacity
        if self.tokens >= self.max_tokens {
            self.last_refill = now;
            return;
        }

        let time_passed = now.duration_since(self.last_refill);
        if self.refill_rate.is_zero() {
            self.tokens = self.max_tokens;
            self.last_refill = now;
        } else if time_passed >= self.refill_rate {
            let tokens_to_add = (time_passed.as_millis() / self.refill_rate.as_millis().max(1)) as u32;
            self.tokens = self.tokens.saturating_add(tokens_to_add).min(self.max_tokens);
            self.last_refill = now;
        }
    }

    pub fn get_remaining_tokens(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
    }

    /// Back to a full bucket
    pub fn reset(&mut self) {
        self.tokens = self.max_tokens;
        self.last_refill = Instant::now();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
