use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::debug;

/// Rate limiter state
#[derive(Debug)]
struct RateLimiterState {
    requests: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiterState {
    fn evict_expired(&mut self, now: Instant) {
        let window = self.window;
        while let Some(&oldest) = self.requests.front() {
            if now.duration_since(oldest) >= window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record `now` if there is room, otherwise report how long until the
    /// oldest request leaves the window.
    fn try_admit(&mut self, now: Instant) -> Result<(), Duration> {
        self.evict_expired(now);

        if self.requests.len() < self.max_requests {
            self.requests.push_back(now);
            return Ok(());
        }

        let oldest = self.requests.front().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }
}

/// Sliding-window limiter for outbound catalog requests
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    /// Create a new rate limiter with specified max requests per window
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            state: Arc::new(Mutex::new(RateLimiterState {
                requests: VecDeque::with_capacity(max_requests),
                max_requests,
                window,
            })),
        }
    }

    /// Suspend until a slot in the window is free, then claim it.
    ///
    /// Returns the total time spent waiting.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();

        loop {
            let delay = {
                let mut state = self.state.lock().await;
                match state.try_admit(Instant::now()) {
                    Ok(()) => return started.elapsed(),
                    Err(delay) => delay,
                }
            };

            debug!(delay_ms = delay.as_millis() as u64, "Rate limit reached, waiting for a slot");
            // Never spin on a zero delay
            tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
        }
    }

    /// Claim a slot without waiting
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        state.try_admit(Instant::now()).is_ok()
    }

    /// Get current request count within the window
    pub async fn current_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.evict_expired(Instant::now());
        state.requests.len()
    }
}
