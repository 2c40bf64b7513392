use crate::error::ProbeError;
use crate::ports::process::ProcessRunner;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Source media facts, derived once per asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    /// ffprobe `format_name`, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub container_format: String,
    pub video_codec: String,
    pub audio_codec: Option<String>,
    /// Frame rate as ffprobe reports it, e.g. `30000/1001`; `0/0` when unknown.
    pub frame_rate: String,
    pub bit_rate: Option<u64>,
    pub original_file_size_bytes: u64,
}

impl ProbeResult {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Parses `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<ProbeResult, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(ProbeError::NoVideoStream)?;
    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let width = video.width.unwrap_or(0);
    let height = video.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(ProbeError::InvalidDimensions { width, height });
    }

    let format = output.format.as_ref();
    let duration_seconds = format
        .and_then(|f| parse_number::<f64>(f.duration.as_deref()))
        .or_else(|| parse_number::<f64>(video.duration.as_deref()))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or(ProbeError::MissingDuration)?;

    let frame_rate = [&video.avg_frame_rate, &video.r_frame_rate]
        .into_iter()
        .flatten()
        .map(|rate| rate.trim())
        .find(|rate| parse_rational(rate).is_some())
        .unwrap_or("0/0")
        .to_string();

    Ok(ProbeResult {
        width,
        height,
        duration_seconds,
        container_format: format
            .and_then(|f| f.format_name.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        video_codec: video
            .codec_name
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        frame_rate,
        bit_rate: format.and_then(|f| parse_number::<u64>(f.bit_rate.as_deref())),
        original_file_size_bytes: format
            .and_then(|f| parse_number::<u64>(f.size.as_deref()))
            .unwrap_or(0),
    })
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

/// `30000/1001` -> 29.97; `0/0` is ffprobe's "unknown".
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((num, den)) => (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?),
        None => (value.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Read-only inspection of a local media file through ffprobe.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe_path: String,
    timeout: Duration,
}

impl MediaProbe {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    pub fn args(path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().into_owned(),
        ]
    }

    pub async fn probe<R>(&self, runner: &R, path: &Path) -> Result<ProbeResult, ProbeError>
    where
        R: ProcessRunner + ?Sized,
    {
        let output = runner
            .run(&self.ffprobe_path, &Self::args(path), self.timeout)
            .await?;
        if !output.success() {
            return Err(ProbeError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr_tail(5),
            });
        }

        let mut result = parse_probe_output(&output.stdout)?;
        if result.original_file_size_bytes == 0 {
            if let Ok(metadata) = tokio::fs::metadata(path).await {
                result.original_file_size_bytes = metadata.len();
            }
        }
        debug!(
            resolution = %result.resolution(),
            duration = result.duration_seconds,
            format = %result.container_format,
            "probed source"
        );
        Ok(result)
    }
}
