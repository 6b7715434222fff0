use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Per-identity fixed-window request limiter.
pub struct CallerRateLimiter {
    limit: u32,
    window: Duration,
    /// subject -> (count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl CallerRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limit: config.limit,
            window: Duration::from_secs(config.window_secs),
            entries: DashMap::new(),
        }
    }

    /// Count a request. Returns Err with retry-after seconds once the window's budget is spent.
    pub fn check(&self, subject: &str) -> Result<(), u64> {
        self.check_at(subject, Instant::now())
    }

    fn check_at(&self, subject: &str, now: Instant) -> Result<(), u64> {
        let mut entry = self
            .entries
            .entry(subject.to_string())
            .or_insert((0, now));
        let (count, start) = entry.value_mut();

        let elapsed = now.saturating_duration_since(*start);
        if elapsed >= self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let remaining = self.window - elapsed;
            return Err(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0));
        }

        *count += 1;
        Ok(())
    }

    /// Drop windows that have already expired.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.saturating_duration_since(*start) < self.window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
