//! Child-process runner used for ffmpeg and ffprobe.

use crate::error::ProcessError;
use crate::ports::process::{ProcessOutput, ProcessRunner};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs programs through `tokio::process`. On timeout the child is killed
/// when its future is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!(program, args = ?args, "spawning");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProcessError::Wait {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                warn!(program, ?timeout, "process timed out, killed");
                return Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    timeout,
                });
            }
        };

        let exit_code = output.status.code();
        if exit_code != Some(0) {
            debug!(program, ?exit_code, "process exited unsuccessfully");
        }
        Ok(ProcessOutput {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let output = TokioProcessRunner::new()
            .run("sh", &sh("echo out; echo err >&2; exit 3"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr_tail(1), "err");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = TokioProcessRunner::new()
            .run("/nonexistent/ffmpeg", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = TokioProcessRunner::new()
            .run("sh", &sh("sleep 5"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut { .. }));
    }
}
