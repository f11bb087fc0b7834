//! Retry policy for image-service fetches.
//!
//! Every failed fetch is reported as a [`FetchError`]; a [`RetryPolicy`]
//! decides whether another attempt is made and how long to wait before it.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }

    /// Whether the failure may clear up on its own.
    ///
    /// Client errors are permanent except 408 (request timeout) and
    /// 429 (rate limited).
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) | FetchError::EmptyBody => true,
            FetchError::Status(code) => !(400..500).contains(code) || *code == 408 || *code == 429,
            FetchError::Io(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Any failure is retried until attempts run out.
    AnyFailure,
    /// Only [`FetchError::is_transient`] failures are retried.
    TransientOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `min(base * 2^retry, max)` where `retry` starts at 0.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => base
                .saturating_mul(2u32.saturating_pow(retry))
                .min(max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff: Backoff,
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            backoff: Backoff::Fixed(Duration::from_secs(2)),
            retry_on: RetryOn::AnyFailure,
        }
    }
}

impl RetryPolicy {
    /// A single attempt with no waiting.
    pub fn single(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            timeout,
            backoff: Backoff::Fixed(Duration::ZERO),
            retry_on: RetryOn::AnyFailure,
        }
    }

    pub fn should_retry(&self, err: &FetchError) -> bool {
        match self.retry_on {
            RetryOn::AnyFailure => true,
            RetryOn::TransientOnly => err.is_transient(),
        }
    }

    /// Delay before the attempt that follows failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt.saturating_sub(1))
    }
}
