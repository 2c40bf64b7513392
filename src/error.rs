//! Error taxonomy for the ingestion pipeline.
//!
//! Ports keep returning boxed errors; the application layer wraps them into
//! these typed errors at the seam.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::jobs::PipelineState;

/// Boxed error returned by port implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("ffprobe exited with {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("unreadable probe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no decodable video stream")]
    NoVideoStream,
    #[error("invalid video dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("duration could not be resolved from container or video stream")]
    MissingDuration,
}

/// A single rung failed. Never fatal on its own.
#[derive(Debug, Error)]
#[error("rendition {rendition}: {kind}")]
pub struct EncodeError {
    pub rendition: String,
    #[source]
    pub kind: EncodeErrorKind,
}

impl EncodeError {
    pub fn new(rendition: impl Into<String>, kind: impl Into<EncodeErrorKind>) -> Self {
        Self {
            rendition: rendition.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeErrorKind {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("encoder exited with {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("rendition playlist missing at {0}")]
    MissingPlaylist(PathBuf),
    #[error("invalid rendition playlist: {0}")]
    InvalidPlaylist(#[from] PlaylistError),
    #[error("segment {0} referenced by playlist was not written")]
    MissingSegment(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("missing #EXTM3U header")]
    MissingHeader,
    #[error("malformed tag on line {line}: {content}")]
    MalformedTag { line: usize, content: String },
    #[error("segment uri without preceding #EXTINF on line {0}")]
    OrphanUri(usize),
    #[error("playlist has no segments")]
    Empty,
    #[error("playlist is not terminated by #EXT-X-ENDLIST")]
    NotEnded,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("refusing to build a master playlist without renditions")]
    NoRenditions,
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("no frame extracted at {offset_seconds}s (exit {exit_code:?}): {stderr}")]
    NoFrame {
        offset_seconds: f64,
        exit_code: Option<i32>,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage {operation} failed for {key}: {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("metadata record for video {video_id} already exists")]
    AlreadyExists { video_id: String },
    #[error("repository error: {0}")]
    Backend(#[source] BoxError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid source asset: {0}")]
    InvalidAsset(String),
    #[error("metadata lookup failed: {0}")]
    Lookup(#[source] PersistError),
    #[error("scratch workspace unavailable: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("download of {key} failed: {source}")]
    Download {
        key: String,
        #[source]
        source: StorageError,
    },
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("stale output purge failed: {0}")]
    Purge(#[source] StorageError),
    #[error("no renditions produced ({attempted} attempted)")]
    NoRenditions { attempted: usize },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("master playlist upload failed: {0}")]
    ManifestUpload(#[source] StorageError),
    #[error("persist failed: {0}")]
    Persist(#[source] PersistError),
}

impl PipelineError {
    /// The step at which the run entered `Failed`.
    pub fn state(&self) -> PipelineState {
        match self {
            PipelineError::InvalidAsset(_)
            | PipelineError::Lookup(_)
            | PipelineError::Workspace(_)
            | PipelineError::Download { .. } => PipelineState::Fetching,
            PipelineError::Probe(_) => PipelineState::Probing,
            PipelineError::Purge(_) | PipelineError::NoRenditions { .. } => {
                PipelineState::Encoding
            }
            PipelineError::Manifest(_) | PipelineError::ManifestUpload(_) => {
                PipelineState::ManifestBuilding
            }
            PipelineError::Persist(_) => PipelineState::Persisting,
        }
    }
}
