//! In-memory fixed-window rate limiter.
//!
//! State lives in this process only. With several instances the effective
//! limit is per instance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::{Config, LimitConfig};
use crate::errors::AppError;

/// Share of calls that also sweep expired windows.
const SWEEP_PROBABILITY: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Result of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window counter keyed by client identifier.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: LimitConfig) -> Self {
        Self {
            max_requests: limit.max_requests,
            window: limit.window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`.
    pub fn check(&self, key: &str) -> RateDecision {
        if rand::rng().random_bool(SWEEP_PROBABILITY) {
            self.sweep();
        }
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key` at a given instant.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + self.window;
        }

        window.count = window.count.saturating_add(1);

        if window.count > self.max_requests {
            RateDecision::Limited {
                retry_after: window.reset_at.saturating_duration_since(now),
            }
        } else {
            RateDecision::Allowed {
                remaining: self.max_requests - window.count,
            }
        }
    }

    /// Like `check`, as a handler-friendly `Result`.
    pub fn enforce(&self, key: &str) -> Result<u32, AppError> {
        match self.check(key) {
            RateDecision::Allowed { remaining } => Ok(remaining),
            RateDecision::Limited { retry_after } => {
                tracing::warn!("Rate limit exceeded for {}", key);
                Err(AppError::RateLimited {
                    retry_after_secs: retry_after.as_secs().max(1),
                })
            }
        }
    }

    /// Drop windows that have expired.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    fn sweep_at(&self, now: Instant) {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        windows.retain(|_, w| w.reset_at > now);
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows
            .lock()
            .map(|w| w.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One limiter per rate-limited route family.
pub struct RateLimits {
    pub contact: RateLimiter,
    pub newsletter: RateLimiter,
    pub track: RateLimiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            contact: RateLimiter::new(config.contact_limit),
            newsletter: RateLimiter::new(config.newsletter_limit),
            track: RateLimiter::new(config.track_limit),
        }
    }
}
