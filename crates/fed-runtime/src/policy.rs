//! Timeout and retry policy for entry fetches.

use std::time::Duration;

use crate::fetcher::FetchError;

/// Timeout configuration for one entry fetch.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Duration,
    /// Total per-attempt timeout.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create a new timeout configuration.
    pub fn new(connect: Duration, total: Duration) -> Self {
        Self { connect, total }
    }

    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: Duration::from_millis((total.as_millis() as u64 / 4).max(50)),
            total,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(500),
            total: Duration::from_secs(5),
        }
    }
}

/// Backoff between retry attempts.
#[derive(Debug, Clone)]
pub enum Backoff {
    /// No delay between retries.
    None,
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff with base and cap.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the given retry attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Exponential { base, max } => {
                let multiplier = 2u64.saturating_pow(attempt);
                let delay = Duration::from_millis(base.as_millis() as u64 * multiplier);
                std::cmp::min(delay, *max)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_secs(2),
        }
    }
}

/// Retry policy for entry fetches.
///
/// Only transport-level failures are retried; a manifest that parses but is
/// malformed will be just as malformed next time.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt.
    pub max_retries: u32,
    /// Backoff between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy with the given retry count.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::None,
        }
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether another attempt should follow this error.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        match error {
            FetchError::Http { status, .. } => (500..600).contains(status),
            FetchError::Timeout(_) | FetchError::Connection(_) => true,
            FetchError::Deserialization(_) | FetchError::Request(_) => false,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Fetch policy combining timeout and retry configuration.
#[derive(Debug, Clone, Default)]
pub struct FetchPolicy {
    /// Timeout configuration.
    pub timeout: TimeoutConfig,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl FetchPolicy {
    /// Create a new fetch policy.
    pub fn new(timeout: TimeoutConfig, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }
}
