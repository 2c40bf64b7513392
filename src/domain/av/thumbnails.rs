use crate::error::{ProcessError, ThumbnailError};
use crate::ports::process::ProcessRunner;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Grabs a single JPEG poster frame from the source.
#[derive(Debug, Clone)]
pub struct ThumbnailExtractor {
    ffmpeg_path: String,
    preferred_offset_seconds: f64,
    timeout: Duration,
}

impl ThumbnailExtractor {
    pub fn new(ffmpeg_path: impl Into<String>, preferred_offset_seconds: f64, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            preferred_offset_seconds,
            timeout,
        }
    }

    /// Offsets to try in order. Sources shorter than the preferred offset
    /// go straight to the first frame.
    pub fn offsets(&self, duration_seconds: Option<f64>) -> Vec<f64> {
        let preferred = self.preferred_offset_seconds.max(0.0);
        match duration_seconds {
            _ if preferred == 0.0 => vec![0.0],
            Some(duration) if duration <= preferred => vec![0.0],
            _ => vec![preferred, 0.0],
        }
    }

    pub fn args(source: &Path, output: &Path, offset_seconds: f64) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-ss".to_string(),
            format!("{:.3}", offset_seconds),
            "-i".to_string(),
            source.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-update".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Writes `output` and returns its path. A run only counts when ffmpeg
    /// exits cleanly and leaves a non-empty file behind.
    pub async fn extract<R>(
        &self,
        runner: &R,
        source: &Path,
        output: &Path,
        duration_seconds: Option<f64>,
    ) -> Result<PathBuf, ThumbnailError>
    where
        R: ProcessRunner + ?Sized,
    {
        let mut last_error = None;

        for offset in self.offsets(duration_seconds) {
            let result = match runner
                .run(&self.ffmpeg_path, &Self::args(source, output, offset), self.timeout)
                .await
            {
                Ok(result) => result,
                // No other offset helps when ffmpeg cannot be started at all.
                Err(e @ ProcessError::Spawn { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!(offset, error = %e, "thumbnail attempt failed");
                    last_error = Some(ThumbnailError::Process(e));
                    continue;
                }
            };

            let written = tokio::fs::metadata(output)
                .await
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if result.success() && written {
                debug!(offset, path = %output.display(), "thumbnail extracted");
                return Ok(output.to_path_buf());
            }

            warn!(offset, exit_code = ?result.exit_code, "no thumbnail frame at offset");
            last_error = Some(ThumbnailError::NoFrame {
                offset_seconds: offset,
                exit_code: result.exit_code,
                stderr: result.stderr_tail(3),
            });
        }

        Err(last_error.unwrap_or(ThumbnailError::NoFrame {
            offset_seconds: 0.0,
            exit_code: None,
            stderr: String::new(),
        }))
    }
}
