//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the store and hook traits,
//! allowing the whole pipeline to be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use nwp_fetch_core::testing::{fixtures, MockObjectStore};
//!
//! let store = Arc::new(MockObjectStore::new());
//! fixtures::seed_run(&store, &fixtures::run(), &[3, 6]).await;
//!
//! // Timestep 6 shows up on the third check
//! store.set_available_after(fixtures::timestep_key(6), 2).await;
//! ```

mod mock_post_processor;
mod mock_store;

pub use mock_post_processor::MockPostProcessor;
pub use mock_store::MockObjectStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use super::MockObjectStore;
    use crate::run::{RunIdentifier, TimestepRequest};
    use crate::source::KeyScheme;

    /// The 2020-12-15 00Z run.
    pub fn run() -> RunIdentifier {
        RunIdentifier::new(
            chrono::NaiveDate::from_ymd_opt(2020, 12, 15).unwrap_or_default(),
            crate::run::RunHour::H00,
        )
    }

    /// GFS 0.25 degree prefix of the fixture run.
    pub fn run_prefix() -> String {
        KeyScheme::gfs().run_prefix(&run())
    }

    /// GFS 0.25 degree key of a timestep of the fixture run.
    pub fn timestep_key(timestep: u32) -> String {
        format!("{}.f{:03}", run_prefix(), timestep)
    }

    /// Fake GRIB content that identifies its timestep.
    pub fn grib_payload(timestep: u32) -> Vec<u8> {
        format!("GRIB f{:03} 7777", timestep).into_bytes()
    }

    /// Publish the given timesteps of `run` in the store.
    pub async fn seed_run(store: &MockObjectStore, run: &RunIdentifier, timesteps: &[u32]) {
        let scheme = KeyScheme::gfs();
        for timestep in timesteps {
            if let Ok(request) = TimestepRequest::new(*run, *timestep) {
                store
                    .put_object(scheme.timestep_key(&request), grib_payload(*timestep))
                    .await;
            }
        }
    }
}
