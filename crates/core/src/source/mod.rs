//! Forecast data sources.
//!
//! A `ForecastSource` knows how a model names its output in the store and
//! exposes the capabilities the orchestrator needs: check a run, check a
//! timestep, download a timestep. New models or stores are added as new
//! implementations selected through `SourceKind`.

mod config;
mod gfs;
mod keys;
mod traits;

pub use config::{SourceConfig, SourceKind};
pub use gfs::GfsSource;
pub use keys::KeyScheme;
pub use traits::ForecastSource;

use std::sync::Arc;

use crate::store::ObjectStore;

/// Create the source selected by configuration.
pub fn create_source(config: &SourceConfig, store: Arc<dyn ObjectStore>) -> Arc<dyn ForecastSource> {
    match config.kind {
        SourceKind::Gfs => Arc::new(GfsSource::new(
            KeyScheme::new(&config.model, &config.product),
            store,
        )),
    }
}
