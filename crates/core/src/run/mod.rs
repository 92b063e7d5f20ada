//! Model run identification.
//!
//! A run (model cycle) is identified by its calendar date and its cycle hour.
//! Every forecast file the pipeline fetches hangs off one `RunIdentifier`.

mod types;

pub use types::{InvalidArgument, RunHour, RunIdentifier, TimestepRequest, MAX_TIMESTEP};
