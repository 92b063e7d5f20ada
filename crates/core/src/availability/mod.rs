//! Availability polling.
//!
//! Existence of a run or a timestep is tested by listing its key prefix with
//! a limit of one. Every check yields an explicit `CheckOutcome`; the
//! `RetryPolicy` decides from that outcome whether to sleep and try again or
//! to stop, so the retry-versus-fatal choice is made per call site through
//! `AbsentPolicy` rather than by error type.

mod checker;
mod config;
mod retry;
mod types;

pub use checker::AvailabilityChecker;
pub use config::{AbsentPolicy, RetryConfig};
pub use retry::RetryPolicy;
pub use types::{AvailabilityOutcome, CheckFailure, CheckOutcome};
