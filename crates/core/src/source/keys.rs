//! Object key naming.
//!
//! Keys are a pure function of the run and the lead time:
//!
//! ```text
//! run prefix:    <model>.<YYYYMMDD>/<HH>/<model>.t<HH>z.<product>
//! timestep key:  <run prefix>.f<FFF>
//! ```

use crate::run::{InvalidArgument, RunIdentifier, TimestepRequest};

/// Naming scheme of one model product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    model: String,
    product: String,
}

impl KeyScheme {
    pub fn new(model: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            product: product.into(),
        }
    }

    /// GFS at 0.25 degree resolution.
    pub fn gfs() -> Self {
        Self::new("gfs", "pgrb2.0p25")
    }

    pub fn run_prefix(&self, run: &RunIdentifier) -> String {
        let hour = run.run_hour();
        format!(
            "{model}.{date}/{hour}/{model}.t{hour}z.{product}",
            model = self.model,
            date = run.date_key(),
            hour = hour,
            product = self.product,
        )
    }

    pub fn timestep_key(&self, request: &TimestepRequest) -> String {
        format!("{}.f{:03}", self.run_prefix(&request.run), request.timestep)
    }

    /// Run prefix from raw trigger inputs.
    pub fn run_prefix_for(&self, date: &str, run_hour: i64) -> Result<String, InvalidArgument> {
        Ok(self.run_prefix(&RunIdentifier::parse(date, run_hour)?))
    }

    /// Timestep key from raw trigger inputs.
    pub fn timestep_key_for(
        &self,
        date: &str,
        run_hour: i64,
        timestep: i64,
    ) -> Result<String, InvalidArgument> {
        let run = RunIdentifier::parse(date, run_hour)?;
        let timestep = u32::try_from(timestep).map_err(|_| InvalidArgument::Timestep(timestep))?;
        Ok(self.timestep_key(&TimestepRequest::new(run, timestep)?))
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::gfs()
    }
}
