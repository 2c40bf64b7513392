use serde::{Deserialize, Serialize};
use std::fmt;

use super::av::probe::ProbeResult;

/// Root of every derived output in object storage.
pub const OUTPUT_ROOT: &str = "uploads/videos";
pub const MASTER_PLAYLIST_NAME: &str = "master.m3u8";
pub const THUMBNAIL_NAME: &str = "thumbnail.jpg";

/// Message carried by the job queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Job {
    UploadCompleted(SourceAsset),
}

/// The just-uploaded raw file, as announced by the upload-completed event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceAsset {
    #[serde(rename = "source_storage_key")]
    pub storage_key: String,
    #[serde(rename = "generated_video_id")]
    pub video_id: String,
    pub owner_id: u64,
    pub category_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl SourceAsset {
    /// `uploads/videos/video_{id}`
    pub fn output_prefix(&self) -> String {
        format!("{}/video_{}", OUTPUT_ROOT, self.video_id)
    }

    pub fn master_playlist_key(&self) -> String {
        format!("{}/{}", self.output_prefix(), MASTER_PLAYLIST_NAME)
    }

    pub fn thumbnail_key(&self) -> String {
        format!("{}/{}", self.output_prefix(), THUMBNAIL_NAME)
    }

    /// The video id namespaces storage keys and scratch directories, so it
    /// must not be able to escape either.
    pub fn validate(&self) -> Result<(), String> {
        if !super::is_path_safe(&self.video_id) {
            return Err(format!("video id {:?} is not path-safe", self.video_id));
        }
        if self.storage_key.trim().is_empty() {
            return Err("source storage key is empty".to_string());
        }
        if self.storage_key.split('/').any(|part| part == "..") {
            return Err(format!(
                "source storage key {:?} escapes the bucket",
                self.storage_key
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Fetching,
    Probing,
    Encoding,
    ManifestBuilding,
    ThumbnailGenerating,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Fetching => "fetching",
            PipelineState::Probing => "probing",
            PipelineState::Encoding => "encoding",
            PipelineState::ManifestBuilding => "manifest_building",
            PipelineState::ThumbnailGenerating => "thumbnail_generating",
            PipelineState::Persisting => "persisting",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The persisted row consumed by the browsing layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoMetadataRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub owner_id: u64,
    pub category_id: u64,
    /// CDN URL of the untouched upload.
    pub original_video_path: String,
    pub manifest_url: String,
    pub duration: f64,
    pub file_format: String,
    /// Source resolution, not a rendition's.
    pub resolution: String,
    pub file_size: u64,
    pub frame_rate: String,
    pub thumbnail_path: Option<String>,
}

impl VideoMetadataRecord {
    pub fn new(
        asset: &SourceAsset,
        probe: &ProbeResult,
        original_video_path: String,
        manifest_url: String,
        thumbnail_path: Option<String>,
    ) -> Self {
        Self {
            video_id: asset.video_id.clone(),
            title: asset.title.clone(),
            description: asset.description.clone(),
            owner_id: asset.owner_id,
            category_id: asset.category_id,
            original_video_path,
            manifest_url,
            duration: probe.duration_seconds,
            file_format: probe.container_format.clone(),
            resolution: probe.resolution(),
            file_size: probe.original_file_size_bytes,
            frame_rate: probe.frame_rate.clone(),
            thumbnail_path,
        }
    }
}

/// Summary of a run that reached `Done`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub video_id: String,
    /// Published rendition names, in ladder order.
    pub renditions: Vec<String>,
    /// Dropped rungs with the reason they were dropped.
    pub failed_renditions: Vec<(String, String)>,
    pub thumbnail_missing: bool,
    pub record: VideoMetadataRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(PipelineReport),
    /// A record for this video id already exists; nothing was touched.
    Skipped { video_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset() -> SourceAsset {
        SourceAsset {
            storage_key: "uploads/videos/cat.mp4".to_string(),
            video_id: "42".to_string(),
            owner_id: 7,
            category_id: 3,
            title: "Cat".to_string(),
            description: "A cat".to_string(),
        }
    }

    #[test]
    fn test_output_layout() {
        let asset = asset();
        assert_eq!(asset.output_prefix(), "uploads/videos/video_42");
        assert_eq!(
            asset.master_playlist_key(),
            "uploads/videos/video_42/master.m3u8"
        );
        assert_eq!(
            asset.thumbnail_key(),
            "uploads/videos/video_42/thumbnail.jpg"
        );
    }

    #[test]
    fn test_job_wire_format() {
        let job: Job = serde_json::from_value(json!({
            "type": "UploadCompleted",
            "source_storage_key": "uploads/videos/cat.mp4",
            "generated_video_id": "42",
            "owner_id": 7,
            "category_id": 3,
            "title": "Cat",
            "description": "A cat"
        }))
        .unwrap();
        assert_eq!(job, Job::UploadCompleted(asset()));
    }

    #[test]
    fn test_description_is_optional() {
        let job: Job = serde_json::from_value(json!({
            "type": "UploadCompleted",
            "source_storage_key": "a.mp4",
            "generated_video_id": "1",
            "owner_id": 1,
            "category_id": 1,
            "title": "t"
        }))
        .unwrap();
        let Job::UploadCompleted(asset) = job;
        assert_eq!(asset.description, "");
    }

    #[test]
    fn test_validate_rejects_unsafe_ids() {
        let mut bad = asset();
        bad.video_id = "../etc".to_string();
        assert!(bad.validate().is_err());

        let mut bad = asset();
        bad.storage_key = "uploads/../../secret".to_string();
        assert!(bad.validate().is_err());

        assert!(asset().validate().is_ok());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(PipelineState::ManifestBuilding.to_string(), "manifest_building");
        assert_eq!(PipelineState::Done.to_string(), "done");
    }
}
