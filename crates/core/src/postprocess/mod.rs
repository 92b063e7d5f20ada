//! Post-processing hooks.
//!
//! A hook is invoked with the local path of every successfully downloaded
//! timestep. Hooks observe; their errors are logged and counted but never
//! change the recorded status of the timestep.

mod command;
mod config;
mod error;
mod traits;

pub use command::{CommandPostProcessor, LogPostProcessor};
pub use config::PostProcessConfig;
pub use error::PostProcessError;
pub use traits::PostProcessor;

use std::sync::Arc;
use std::time::Duration;

/// Build the hook selected by configuration, if any.
///
/// A configured command takes precedence over `log_only`.
pub fn create_post_processor(config: &PostProcessConfig) -> Option<Arc<dyn PostProcessor>> {
    if let Some((program, args)) = config.command.as_ref().and_then(|c| c.split_first()) {
        return Some(Arc::new(
            CommandPostProcessor::new(program, args.to_vec())
                .with_timeout(Duration::from_secs(config.timeout_secs)),
        ));
    }
    if config.log_only {
        return Some(Arc::new(LogPostProcessor));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_post_processor() {
        assert!(create_post_processor(&PostProcessConfig::default()).is_none());

        let log_only = PostProcessConfig {
            log_only: true,
            ..Default::default()
        };
        assert_eq!(create_post_processor(&log_only).unwrap().name(), "log");

        let command = PostProcessConfig {
            command: Some(vec!["wgrib2".to_string(), "-s".to_string()]),
            log_only: true,
            ..Default::default()
        };
        assert_eq!(create_post_processor(&command).unwrap().name(), "command");
    }

    #[test]
    fn test_empty_command_is_ignored() {
        let config = PostProcessConfig {
            command: Some(Vec::new()),
            ..Default::default()
        };
        assert!(create_post_processor(&config).is_none());
    }
}
