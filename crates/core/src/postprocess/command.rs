//! Built-in post-processors.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::error::PostProcessError;
use super::traits::PostProcessor;
use crate::run::TimestepRequest;

/// Logs every downloaded path and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPostProcessor;

#[async_trait]
impl PostProcessor for LogPostProcessor {
    fn name(&self) -> &str {
        "log"
    }

    async fn process(&self, request: &TimestepRequest, path: &Path) -> Result<(), PostProcessError> {
        info!(
            run = %request.run,
            timestep = request.timestep,
            path = %path.display(),
            "Downloaded file ready"
        );
        Ok(())
    }
}

/// Runs an external command with the downloaded path as last argument.
#[derive(Debug, Clone)]
pub struct CommandPostProcessor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPostProcessor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PostProcessor for CommandPostProcessor {
    fn name(&self) -> &str {
        "command"
    }

    async fn process(&self, request: &TimestepRequest, path: &Path) -> Result<(), PostProcessError> {
        debug!(
            program = %self.program,
            timestep = request.timestep,
            path = %path.display(),
            "Running post-process command"
        );

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PostProcessError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PostProcessError::Timeout {
                program: self.program.clone(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| PostProcessError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(PostProcessError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::run::RunIdentifier;
    use tempfile::TempDir;

    fn request() -> TimestepRequest {
        TimestepRequest::new(RunIdentifier::parse("20201215", 0).unwrap(), 3).unwrap()
    }

    #[tokio::test]
    async fn test_command_receives_path_as_last_argument() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("seen");
        let downloaded = dir.path().join("gfs.t00z.pgrb2.0p25.f003");
        let script = format!("echo \"$1\" > {}", marker.display());

        let hook = CommandPostProcessor::new(
            "sh",
            vec!["-c".to_string(), script, "hook".to_string()],
        );
        hook.process(&request(), &downloaded).await.unwrap();

        let seen = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(seen.trim(), downloaded.display().to_string());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let hook = CommandPostProcessor::new(
            "sh",
            vec!["-c".to_string(), "echo broken >&2; exit 3".to_string(), "hook".to_string()],
        );
        let err = hook.process(&request(), Path::new("/tmp/f003")).await.unwrap_err();
        match err {
            PostProcessError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let hook = CommandPostProcessor::new("/nonexistent/nwp-hook", Vec::new());
        let err = hook.process(&request(), Path::new("/tmp/f003")).await.unwrap_err();
        assert!(matches!(err, PostProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let hook = CommandPostProcessor::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string(), "hook".to_string()],
        )
        .with_timeout(Duration::from_millis(100));
        let err = hook.process(&request(), Path::new("/tmp/f003")).await.unwrap_err();
        assert!(matches!(err, PostProcessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_log_post_processor() {
        assert!(LogPostProcessor
            .process(&request(), Path::new("/tmp/f003"))
            .await
            .is_ok());
    }
}
