//! Immutable pipeline description built from configuration and a trigger.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::OrchestratorError;
use crate::availability::RetryConfig;
use crate::config::Config;
use crate::run::{InvalidArgument, RunHour, RunIdentifier, TimestepRequest};

/// What a scheduler passes for one invocation.
///
/// Only `run_hour` is required; everything else falls back to
/// configuration, and a missing `date` is the UTC date of `triggered_at`
/// (now when absent).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunParameters {
    pub run_hour: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timesteps: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
}

impl RunParameters {
    pub fn new(run_hour: i64) -> Self {
        Self {
            run_hour,
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_timesteps(mut self, timesteps: Vec<i64>) -> Self {
        self.timesteps = Some(timesteps);
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }

    pub fn triggered_at(mut self, at: DateTime<Utc>) -> Self {
        self.triggered_at = Some(at);
        self
    }

    /// Resolve the run identifier of this trigger.
    pub fn resolve_run(&self) -> Result<RunIdentifier, InvalidArgument> {
        match &self.date {
            Some(date) => RunIdentifier::parse(date, self.run_hour),
            None => {
                let run_hour = RunHour::try_from(self.run_hour)?;
                Ok(RunIdentifier::for_trigger(
                    run_hour,
                    self.triggered_at.unwrap_or_else(Utc::now),
                ))
            }
        }
    }
}

/// Everything one invocation needs, validated and resolved.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    name: String,
    run: RunIdentifier,
    timesteps: Vec<TimestepRequest>,
    download_dir: PathBuf,
    max_concurrent: usize,
    run_retry: RetryConfig,
    timestep_retry: RetryConfig,
}

impl PipelinePlan {
    /// Build the plan for one trigger.
    ///
    /// The plan is named `<download.name>-run<HH>`. Timesteps keep their
    /// configured order; repeated ones are dropped.
    pub fn build(config: &Config, params: RunParameters) -> Result<Self, OrchestratorError> {
        let run = params.resolve_run()?;

        let raw_timesteps: Vec<i64> = match params.timesteps {
            Some(timesteps) => timesteps,
            None => config
                .download
                .timesteps
                .iter()
                .map(|t| i64::from(*t))
                .collect(),
        };
        if raw_timesteps.is_empty() {
            return Err(OrchestratorError::InvalidPlan(
                "at least one timestep is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut timesteps = Vec::with_capacity(raw_timesteps.len());
        for raw in raw_timesteps {
            let timestep = u32::try_from(raw).map_err(|_| InvalidArgument::Timestep(raw))?;
            if seen.insert(timestep) {
                timesteps.push(TimestepRequest::new(run, timestep)?);
            }
        }

        let max_concurrent = params.max_concurrent.unwrap_or(config.download.max_concurrent);
        if max_concurrent == 0 {
            return Err(OrchestratorError::InvalidPlan(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        let download_dir = params
            .download_dir
            .unwrap_or_else(|| config.download.dir.clone());
        if download_dir.as_os_str().is_empty() {
            return Err(OrchestratorError::InvalidPlan(
                "download directory must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name: format!("{}-run{}", config.download.name, run.run_hour()),
            run,
            timesteps,
            download_dir,
            max_concurrent,
            run_retry: config.retry.run.clone(),
            timestep_retry: config.retry.timestep.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self) -> &RunIdentifier {
        &self.run
    }

    pub fn timesteps(&self) -> &[TimestepRequest] {
        &self.timesteps
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn run_retry(&self) -> &RetryConfig {
        &self.run_retry
    }

    pub fn timestep_retry(&self) -> &RetryConfig {
        &self.timestep_retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_build_with_explicit_date() {
        let plan = PipelinePlan::build(
            &config(),
            RunParameters::new(12).with_date("20201215"),
        )
        .unwrap();

        assert_eq!(plan.run().to_string(), "20201215/12");
        let timesteps: Vec<u32> = plan.timesteps().iter().map(|t| t.timestep).collect();
        assert_eq!(timesteps, vec![3, 6]);
        assert_eq!(plan.max_concurrent(), 5);
        assert_eq!(plan.name(), "gfs-download-run12");
    }

    #[test]
    fn test_date_defaults_to_trigger_day() {
        let triggered_at = Utc.with_ymd_and_hms(2021, 3, 4, 23, 59, 0).unwrap();
        let plan = PipelinePlan::build(
            &config(),
            RunParameters::new(18).triggered_at(triggered_at),
        )
        .unwrap();

        assert_eq!(plan.run().date_key(), "20210304");
    }

    #[test]
    fn test_parameters_override_config() {
        let plan = PipelinePlan::build(
            &config(),
            RunParameters::new(0)
                .with_date("20201215")
                .with_timesteps(vec![0, 3, 3, 120, 0])
                .with_download_dir("/srv/gfs")
                .with_max_concurrent(2),
        )
        .unwrap();

        let timesteps: Vec<u32> = plan.timesteps().iter().map(|t| t.timestep).collect();
        assert_eq!(timesteps, vec![0, 3, 120]);
        assert_eq!(plan.download_dir(), Path::new("/srv/gfs"));
        assert_eq!(plan.max_concurrent(), 2);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let err = PipelinePlan::build(&config(), RunParameters::new(-6)).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidArgument(InvalidArgument::RunHour(_))
        ));

        let err = PipelinePlan::build(
            &config(),
            RunParameters::new(0).with_date("20201215").with_timesteps(vec![3, -1]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidArgument(InvalidArgument::Timestep(-1))
        ));

        let err = PipelinePlan::build(
            &config(),
            RunParameters::new(0).with_date("20201215").with_max_concurrent(0),
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPlan(_)));

        let err = PipelinePlan::build(
            &config(),
            RunParameters::new(0).with_date("20201215").with_timesteps(Vec::new()),
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPlan(_)));
    }

    #[test]
    fn test_parameters_from_json() {
        let params: RunParameters =
            serde_json::from_str(r#"{"run_hour": 6, "date": "20201215", "timesteps": [3]}"#)
                .unwrap();
        let plan = PipelinePlan::build(&config(), params).unwrap();
        assert_eq!(plan.run().to_string(), "20201215/06");
        assert_eq!(plan.timesteps().len(), 1);
    }
}
