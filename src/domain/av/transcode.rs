use super::ladder::RenditionSpec;
use crate::domain::hls::MediaPlaylist;
use crate::error::{EncodeError, EncodeErrorKind};
use crate::ports::process::ProcessRunner;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const RENDITION_PLAYLIST_NAME: &str = "playlist.m3u8";
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

/// Per encode; rungs may run side by side.
const ENCODER_THREADS: &str = "2";

/// Local result of one successful encode; uploading it is the caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRendition {
    pub spec: RenditionSpec,
    pub output_dir: PathBuf,
    pub playlist_path: PathBuf,
    /// Segments in playlist order followed by the playlist itself.
    pub files: Vec<PathBuf>,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg_path: String,
    segment_seconds: u32,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(ffmpeg_path: impl Into<String>, segment_seconds: u32, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            segment_seconds,
            timeout,
        }
    }

    pub fn encode_args(&self, source: &Path, spec: &RenditionSpec, output_dir: &Path) -> Vec<String> {
        let scale = format!(
            "scale={}:{}:force_original_aspect_ratio=decrease:force_divisible_by=2",
            spec.target_width, spec.target_height
        );
        let mut args: Vec<String> = Vec::with_capacity(40);
        let mut push = |values: &[&str]| args.extend(values.iter().map(|v| v.to_string()));

        push(&["-y", "-hide_banner", "-nostdin"]);
        push(&["-threads", ENCODER_THREADS]);
        push(&["-i", &source.to_string_lossy()]);
        push(&["-vf", &scale]);
        push(&["-c:v", "libx264"]);
        push(&["-b:v", &format!("{}k", spec.video_bitrate_kbps)]);
        push(&["-maxrate", &format!("{}k", spec.max_rate_kbps())]);
        push(&["-bufsize", &format!("{}k", spec.buffer_size_kbps())]);
        push(&["-c:a", "aac"]);
        push(&["-b:a", &spec.audio_bitrate]);
        push(&["-f", "hls"]);
        push(&["-hls_time", &self.segment_seconds.to_string()]);
        push(&["-hls_playlist_type", "vod"]);
        push(&[
            "-hls_segment_filename",
            &output_dir.join(SEGMENT_PATTERN).to_string_lossy(),
        ]);
        push(&[&output_dir.join(RENDITION_PLAYLIST_NAME).to_string_lossy()]);
        args
    }

    /// Encodes one rung into `output_dir`. Nonzero exit, timeout, a missing
    /// playlist or a playlist pointing at missing segments all fail the rung.
    pub async fn encode<R>(
        &self,
        runner: &R,
        source: &Path,
        spec: &RenditionSpec,
        output_dir: &Path,
    ) -> Result<EncodedRendition, EncodeError>
    where
        R: ProcessRunner + ?Sized,
    {
        let fail = |kind: EncodeErrorKind| EncodeError::new(&spec.name, kind);

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| fail(e.into()))?;

        info!(rendition = %spec.name, resolution = %spec.resolution(), "encoding rendition");
        let output = runner
            .run(
                &self.ffmpeg_path,
                &self.encode_args(source, spec, output_dir),
                self.timeout,
            )
            .await
            .map_err(|e| fail(e.into()))?;

        if !output.success() {
            return Err(fail(EncodeErrorKind::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr_tail(5),
            }));
        }

        let playlist_path = output_dir.join(RENDITION_PLAYLIST_NAME);
        let text = match tokio::fs::read_to_string(&playlist_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(fail(EncodeErrorKind::MissingPlaylist(playlist_path)));
            }
            Err(e) => return Err(fail(e.into())),
        };

        let playlist = MediaPlaylist::parse(&text).map_err(|e| fail(e.into()))?;
        playlist.validate_vod().map_err(|e| fail(e.into()))?;

        let mut files = Vec::with_capacity(playlist.segments.len() + 1);
        for segment in &playlist.segments {
            let path = output_dir.join(&segment.uri);
            let inside = Path::new(&segment.uri)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if !inside || !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(fail(EncodeErrorKind::MissingSegment(path)));
            }
            files.push(path);
        }
        files.push(playlist_path.clone());

        debug!(
            rendition = %spec.name,
            segments = playlist.segments.len(),
            duration = playlist.total_duration(),
            "rendition encoded"
        );

        Ok(EncodedRendition {
            spec: spec.clone(),
            output_dir: output_dir.to_path_buf(),
            playlist_path,
            files,
            duration_seconds: playlist.total_duration(),
        })
    }
}
