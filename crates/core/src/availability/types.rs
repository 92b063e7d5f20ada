//! Outcome types for availability checks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a single check did not confirm availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckFailure {
    /// Nothing matched the prefix yet.
    Absent { prefix: String },
    /// The store could not answer.
    Store {
        prefix: String,
        error_kind: String,
        message: String,
    },
}

impl CheckFailure {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent { prefix } => write!(f, "{} is not yet available", prefix),
            Self::Store {
                prefix, message, ..
            } => write!(f, "checking {} failed: {}", prefix, message),
        }
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Ok,
    /// Not there (yet); ask again after a delay.
    Retryable(CheckFailure),
    /// Stop polling.
    Fatal(CheckFailure),
}

/// Result of polling a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityOutcome {
    Available {
        attempts: u32,
        checked_at: DateTime<Utc>,
    },
    /// A one-shot probe found nothing; a later trigger may.
    Pending {
        last_checked_at: DateTime<Utc>,
        reason: CheckFailure,
    },
    /// Every attempt of the budget came back retryable.
    Exhausted {
        attempts: u32,
        last_checked_at: DateTime<Utc>,
        last_failure: CheckFailure,
    },
    /// A check came back fatal; no further attempt was made.
    Aborted {
        attempts: u32,
        at: DateTime<Utc>,
        failure: CheckFailure,
    },
}

impl AvailabilityOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Number of checks performed.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Available { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
            Self::Pending { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_failure_display() {
        let absent = CheckFailure::Absent {
            prefix: "gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003".to_string(),
        };
        assert_eq!(
            absent.to_string(),
            "gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003 is not yet available"
        );
        assert!(absent.is_absent());

        let store = CheckFailure::Store {
            prefix: "p".to_string(),
            error_kind: "permission_denied".to_string(),
            message: "permission denied on p".to_string(),
        };
        assert_eq!(store.to_string(), "checking p failed: permission denied on p");
        assert!(!store.is_absent());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = AvailabilityOutcome::Exhausted {
            attempts: 6,
            last_checked_at: Utc::now(),
            last_failure: CheckFailure::Absent {
                prefix: "p".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "exhausted");
        assert_eq!(json["attempts"], 6);
        assert_eq!(json["last_failure"]["kind"], "absent");
        assert_eq!(outcome.attempts(), 6);
        assert!(!outcome.is_available());
    }
}
