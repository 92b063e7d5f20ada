//! Existence checks against the object store.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tracing::debug;

use super::config::AbsentPolicy;
use super::types::{AvailabilityOutcome, CheckFailure, CheckOutcome};
use crate::metrics;
use crate::store::{ObjectStore, StoreError};

/// Tests whether anything exists under a prefix.
///
/// Stateless: every call is an independent listing.
#[derive(Clone)]
pub struct AvailabilityChecker {
    store: Arc<dyn ObjectStore>,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// List with a limit of one; non-empty means present.
    pub async fn exists(&self, prefix: &str) -> Result<bool, StoreError> {
        let mut listing = self.store.list(prefix, Some(1));
        let result = match listing.next().await {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e),
            None => Ok(false),
        };

        let label = match &result {
            Ok(true) => "present",
            Ok(false) => "absent",
            Err(_) => "error",
        };
        metrics::AVAILABILITY_CHECKS.with_label_values(&[label]).inc();
        debug!(prefix, result = label, "Availability check");

        result
    }

    /// One check, classified for the retry policy.
    ///
    /// Transient store errors are always retryable, other store errors are
    /// fatal. An empty listing follows `on_absent`.
    pub async fn check(&self, prefix: &str, on_absent: AbsentPolicy) -> CheckOutcome {
        match self.exists(prefix).await {
            Ok(true) => CheckOutcome::Ok,
            Ok(false) => {
                let failure = CheckFailure::Absent {
                    prefix: prefix.to_string(),
                };
                match on_absent {
                    AbsentPolicy::Retry => CheckOutcome::Retryable(failure),
                    AbsentPolicy::Fail => CheckOutcome::Fatal(failure),
                }
            }
            Err(e) => {
                let failure = CheckFailure::Store {
                    prefix: prefix.to_string(),
                    error_kind: e.kind().to_string(),
                    message: e.to_string(),
                };
                if e.is_transient() {
                    CheckOutcome::Retryable(failure)
                } else {
                    CheckOutcome::Fatal(failure)
                }
            }
        }
    }

    /// A single check without retries: `Available`, `Pending` (absent or a
    /// transient error), or `Aborted` on a permanent store error.
    pub async fn probe(&self, prefix: &str) -> AvailabilityOutcome {
        let outcome = self.check(prefix, AbsentPolicy::Retry).await;
        let checked_at = Utc::now();
        match outcome {
            CheckOutcome::Ok => AvailabilityOutcome::Available {
                attempts: 1,
                checked_at,
            },
            CheckOutcome::Retryable(reason) => AvailabilityOutcome::Pending {
                last_checked_at: checked_at,
                reason,
            },
            CheckOutcome::Fatal(failure) => AvailabilityOutcome::Aborted {
                attempts: 1,
                at: checked_at,
                failure,
            },
        }
    }
}
