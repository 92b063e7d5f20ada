pub mod availability;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod postprocess;
pub mod run;
pub mod source;
pub mod store;
pub mod testing;

pub use availability::{
    AbsentPolicy, AvailabilityChecker, AvailabilityOutcome, CheckFailure, CheckOutcome,
    RetryConfig, RetryPolicy,
};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, RetrySettings,
};
pub use orchestrator::{
    DownloadConfig, DownloadOrchestrator, DownloadResult, FailureKind, OrchestratorError,
    PipelinePlan, PipelineResult, RunParameters, TimestepFailure, TimestepStatus,
};
pub use postprocess::{
    create_post_processor, CommandPostProcessor, LogPostProcessor, PostProcessConfig,
    PostProcessError, PostProcessor,
};
pub use run::{InvalidArgument, RunHour, RunIdentifier, TimestepRequest, MAX_TIMESTEP};
pub use source::{create_source, ForecastSource, GfsSource, KeyScheme, SourceConfig, SourceKind};
pub use store::{
    create_object_store, LocalObjectStore, ObjectStore, ObjectSummary, S3ObjectStore,
    StoreBackend, StoreConfig, StoreError,
};
