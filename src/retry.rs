//! Backoff schedules for per-repository sync retries.
//!
//! Only sync failures are retried. Listing and classification errors abort
//! the run without ever consulting a schedule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Delays used when no schedule is configured.
pub const DEFAULT_DELAYS_SECS: [u64; 5] = [5, 15, 45, 90, 180];

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    Retry(Duration),
    /// Give up; the job is finalized as failed.
    Stop,
}

/// Ordered, finite sequence of backoff delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryScheduler {
    /// Explicit list of delays. `K` delays allow `K + 1` attempts.
    Fixed(Vec<Duration>),
    /// `initial * multiplier^n`, each delay capped at `max_delay`, stopping
    /// once the summed delays would exceed `max_elapsed`.
    Exponential {
        initial: Duration,
        multiplier: u32,
        max_delay: Duration,
        max_elapsed: Duration,
    },
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::Fixed(
            DEFAULT_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        )
    }
}

impl RetryScheduler {
    /// Decision after the failure of attempt number `attempt` (zero based).
    pub fn next(&self, attempt: usize) -> RetryDecision {
        match self {
            Self::Fixed(delays) => delays
                .get(attempt)
                .copied()
                .map_or(RetryDecision::Stop, RetryDecision::Retry),
            Self::Exponential { max_elapsed, .. } => {
                let mut elapsed = Duration::ZERO;
                for n in 0..=attempt {
                    let delay = self.exponential_delay(n);
                    if delay.is_zero() {
                        return RetryDecision::Stop;
                    }
                    elapsed = elapsed.saturating_add(delay);
                    if elapsed > *max_elapsed {
                        return RetryDecision::Stop;
                    }
                }
                RetryDecision::Retry(self.exponential_delay(attempt))
            }
        }
    }

    fn exponential_delay(&self, n: usize) -> Duration {
        let Self::Exponential {
            initial,
            multiplier,
            max_delay,
            ..
        } = self
        else {
            return Duration::ZERO;
        };

        let factor = u32::try_from(n)
            .ok()
            .and_then(|n| multiplier.checked_pow(n))
            .unwrap_or(u32::MAX);
        initial.saturating_mul(factor).min(*max_delay)
    }
}

/// Retry settings as written in the settings file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum RetrySettings {
    /// `delays: ["5s", "15s", ...]`
    Fixed {
        #[serde(default = "default_delays")]
        delays: Vec<String>,
    },
    /// Exponential growth with a cap on the total time spent waiting.
    Exponential {
        #[serde(default = "default_initial")]
        initial: String,
        #[serde(default = "default_multiplier")]
        multiplier: u32,
        #[serde(default = "default_max_delay")]
        max_delay: String,
        #[serde(default = "default_max_elapsed")]
        max_elapsed: String,
    },
}

fn default_delays() -> Vec<String> {
    DEFAULT_DELAYS_SECS.iter().map(|s| format!("{s}s")).collect()
}
fn default_initial() -> String {
    "5s".to_string()
}
fn default_multiplier() -> u32 {
    2
}
fn default_max_delay() -> String {
    "3m".to_string()
}
fn default_max_elapsed() -> String {
    "10m".to_string()
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::Fixed {
            delays: default_delays(),
        }
    }
}

impl RetrySettings {
    /// Resolve duration strings into a schedule.
    pub fn to_scheduler(&self) -> Result<RetryScheduler, ConfigError> {
        match self {
            Self::Fixed { delays } => Ok(RetryScheduler::Fixed(
                delays
                    .iter()
                    .map(|d| parse_duration(d))
                    .collect::<Result<_, _>>()?,
            )),
            Self::Exponential {
                initial,
                multiplier,
                max_delay,
                max_elapsed,
            } => {
                if *multiplier == 0 {
                    return Err(ConfigError::Invalid(
                        "retry multiplier must be at least 1".to_string(),
                    ));
                }
                Ok(RetryScheduler::Exponential {
                    initial: parse_duration(initial)?,
                    multiplier: *multiplier,
                    max_delay: parse_duration(max_delay)?,
                    max_elapsed: parse_duration(max_elapsed)?,
                })
            }
        }
    }
}

/// Parse `"250ms"`, `"30s"`, `"5m"`, `"1h"` or bare seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim().to_lowercase();
    let invalid = || ConfigError::Duration(value.clone());

    let (number, unit_ms) = if let Some(v) = value.strip_suffix("ms") {
        (v, 1)
    } else if let Some(v) = value.strip_suffix('s') {
        (v, 1_000)
    } else if let Some(v) = value.strip_suffix('m') {
        (v, 60_000)
    } else if let Some(v) = value.strip_suffix('h') {
        (v, 3_600_000)
    } else {
        (value.as_str(), 1_000)
    };

    let number: u64 = number.trim().parse().map_err(|_| invalid())?;
    number
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}
