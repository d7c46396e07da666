//! Retry budget, backoff schedule and timeouts for outbound calls

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

use crate::config::HttpConfig;

use super::CallError;

/// Retry and timeout policy shared by every adapter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,
    /// Seed of the exponential schedule, in seconds
    pub backoff_factor: f64,
    /// Upper bound on a computed backoff delay
    pub max_backoff: Duration,
    /// Timeout for establishing the TCP/TLS connection
    pub connect_timeout: Duration,
    /// Timeout for each read once connected
    pub read_timeout: Duration,
    /// HTTP statuses treated as transient
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    /// Build the policy from the `http` config section
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.retries,
            backoff_factor: config.backoff_factor,
            max_backoff: Duration::from_secs(config.max_backoff_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    /// Exponential backoff before retry number `retry` (0-based):
    /// `backoff_factor * 2^retry`, capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if self.backoff_factor <= 0.0 || !self.backoff_factor.is_finite() {
            return Duration::ZERO;
        }
        // cap in f64 first, the product can exceed what Duration holds
        let secs = (self.backoff_factor * 2f64.powi(retry.min(30) as i32))
            .min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(secs).map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    /// Delay before retry number `retry`. A server Retry-After is a floor,
    /// itself capped at `max_backoff`.
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.backoff(retry);
        match retry_after {
            Some(server) => computed.max(server.min(self.max_backoff)),
            None => computed,
        }
    }

    /// Whether a failed attempt may be retried
    pub fn should_retry(&self, err: &CallError) -> bool {
        err.is_transient(&self.retry_statuses)
    }
}

/// Parse a `Retry-After` header, in delay-seconds or HTTP-date form.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    if let Ok(secs) = value.parse::<f64>() {
        // out-of-range values are ignored like any other unusable hint
        return Duration::try_from_secs_f64(secs).ok();
    }

    let at: DateTime<Utc> = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    Some(wait)
}
