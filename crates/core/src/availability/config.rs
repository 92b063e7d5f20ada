//! Retry configuration for one check site.

use serde::{Deserialize, Serialize};

/// What an empty listing means at a check site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentPolicy {
    /// Not published yet: wait and check again.
    #[default]
    Retry,
    /// Give up at once and leave it to the next trigger.
    Fail,
}

/// Retry budget of one check site (run gate or timestep).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of checks, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed check, in seconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Growth factor applied to the delay after each further failure.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on a single delay, in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    #[serde(default)]
    pub on_absent: AbsentPolicy,
}

fn default_max_attempts() -> u32 {
    6 // one check plus five retries
}

fn default_initial_delay() -> u64 {
    60
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_delay() -> u64 {
    3600
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_secs: default_max_delay(),
            on_absent: AbsentPolicy::default(),
        }
    }
}

impl RetryConfig {
    /// Sets the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the initial delay and multiplier.
    pub fn with_backoff(mut self, initial_delay_secs: u64, multiplier: f64) -> Self {
        self.initial_delay_secs = initial_delay_secs;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the absent policy.
    pub fn with_on_absent(mut self, on_absent: AbsentPolicy) -> Self {
        self.on_absent = on_absent;
        self
    }
}
