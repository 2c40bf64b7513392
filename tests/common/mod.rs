//! In-memory collaborators for driving the pipeline end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vodpipe::config::PipelineConfig;
use vodpipe::domain::hls::MediaPlaylist;
use vodpipe::domain::jobs::{SourceAsset, VideoMetadataRecord};
use vodpipe::error::ProcessError;
use vodpipe::ports::process::{ProcessOutput, ProcessRunner};
use vodpipe::ports::repository::VideoRepository;
use vodpipe::ports::storage::StoragePort;
use vodpipe::PipelineOrchestrator;

type BoxError = Box<dyn Error + Send + Sync>;

pub const CDN: &str = "https://cdn.example.com";
pub const SOURCE_KEY: &str = "raw/clip.mp4";

#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    fail_uploads_ending_with: Arc<Mutex<Option<String>>>,
    uploads: Arc<Mutex<usize>>,
}

impl MemoryStorage {
    pub fn with_source() -> Self {
        let storage = Self::default();
        storage.put(SOURCE_KEY, b"not really a video");
        storage
    }

    pub fn put(&self, key: &str, data: &[u8]) {
        self.objects.lock().unwrap().insert(key.to_string(), data.to_vec());
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap()
    }

    pub fn fail_uploads_ending_with(&self, suffix: &str) {
        *self.fail_uploads_ending_with.lock().unwrap() = Some(suffix.to_string());
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), BoxError> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| format!("no such key {key}"))?;
        tokio::fs::write(local_path, data).await?;
        Ok(())
    }

    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), BoxError> {
        let failing = self.fail_uploads_ending_with.lock().unwrap().clone();
        if let Some(suffix) = failing {
            if key.ends_with(&suffix) {
                return Err("injected upload failure".into());
            }
        }
        let data = tokio::fs::read(local_path).await?;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        *self.uploads.lock().unwrap() += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BoxError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BoxError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    records: Arc<Mutex<HashMap<String, VideoMetadataRecord>>>,
    broken: Arc<Mutex<bool>>,
}

impl MemoryRepository {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn get(&self, video_id: &str) -> Option<VideoMetadataRecord> {
        self.records.lock().unwrap().get(video_id).cloned()
    }

    pub fn break_writes(&self) {
        *self.broken.lock().unwrap() = true;
    }
}

#[async_trait]
impl VideoRepository for MemoryRepository {
    async fn find_by_video_id(&self, video_id: &str) -> Result<Option<VideoMetadataRecord>, BoxError> {
        Ok(self.get(video_id))
    }

    async fn insert_if_absent(&self, record: &VideoMetadataRecord) -> Result<bool, BoxError> {
        if *self.broken.lock().unwrap() {
            return Err("table unavailable".into());
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.video_id) {
            return Ok(false);
        }
        records.insert(record.video_id.clone(), record.clone());
        Ok(true)
    }
}

/// Stands in for ffprobe/ffmpeg: answers probes with a fixed source and
/// writes plausible HLS output for encodes.
#[derive(Clone)]
pub struct FakeRunner {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    failing_renditions: Arc<Mutex<HashSet<String>>>,
    probe_fails: Arc<Mutex<bool>>,
    thumbnail_fails_at: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeRunner {
    pub fn new(width: u32, height: u32, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
            failing_renditions: Default::default(),
            probe_fails: Default::default(),
            thumbnail_fails_at: Default::default(),
            calls: Default::default(),
        }
    }

    pub fn fail_rendition(&self, name: &str) {
        self.failing_renditions.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_probe(&self) {
        *self.probe_fails.lock().unwrap() = true;
    }

    /// `-ss` values (e.g. `1.000`) at which no frame is produced.
    pub fn fail_thumbnail_at(&self, offsets: &[&str]) {
        *self.thumbnail_fails_at.lock().unwrap() = offsets.iter().map(|s| s.to_string()).collect();
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn encode_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|args| args.iter().any(|a| a == "-hls_segment_filename"))
            .count()
    }

    fn probe_output(&self) -> ProcessOutput {
        if *self.probe_fails.lock().unwrap() {
            return exited(1, b"Invalid data found when processing input");
        }
        let json = serde_json::json!({
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": self.width,
                    "height": self.height,
                    "avg_frame_rate": "30/1"
                },
                { "codec_type": "audio", "codec_name": "aac" }
            ],
            "format": {
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": format!("{:.6}", self.duration),
                "size": "18"
            }
        });
        ProcessOutput {
            exit_code: Some(0),
            stdout: serde_json::to_vec(&json).unwrap(),
            stderr: vec![],
        }
    }

    fn encode(&self, args: &[String]) -> ProcessOutput {
        let playlist_path = PathBuf::from(args.last().unwrap());
        let out_dir = playlist_path.parent().unwrap();
        let rendition = out_dir.file_name().unwrap().to_string_lossy().into_owned();
        if self.failing_renditions.lock().unwrap().contains(&rendition) {
            return exited(1, b"Error while opening encoder");
        }

        let mut playlist = MediaPlaylist::new(6);
        playlist.playlist_type = Some("VOD".to_string());
        let mut remaining = self.duration;
        let mut index = 0;
        while remaining > 0.0 {
            let length = remaining.min(6.0);
            let name = format!("segment_{:03}.ts", index);
            std::fs::write(out_dir.join(&name), b"ts").unwrap();
            playlist.add_segment(length, name);
            remaining -= length;
            index += 1;
        }
        std::fs::write(&playlist_path, playlist.render()).unwrap();
        exited(0, b"")
    }

    fn thumbnail(&self, args: &[String]) -> ProcessOutput {
        let offset = args
            .iter()
            .position(|a| a == "-ss")
            .map(|i| args[i + 1].clone())
            .unwrap_or_default();
        if self.thumbnail_fails_at.lock().unwrap().contains(&offset) {
            return exited(1, b"Output file is empty, nothing was encoded");
        }
        std::fs::write(args.last().unwrap(), b"\xff\xd8jpeg").unwrap();
        exited(0, b"")
    }
}

fn exited(code: i32, stderr: &[u8]) -> ProcessOutput {
    ProcessOutput {
        exit_code: Some(code),
        stdout: vec![],
        stderr: stderr.to_vec(),
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String], _timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if program == "ffprobe" {
            return Ok(self.probe_output());
        }
        if args.iter().any(|a| a == "-hls_segment_filename") {
            return Ok(self.encode(args));
        }
        Ok(self.thumbnail(args))
    }
}

pub fn asset(video_id: &str) -> SourceAsset {
    SourceAsset {
        storage_key: SOURCE_KEY.to_string(),
        video_id: video_id.to_string(),
        owner_id: 7,
        category_id: 3,
        title: "Clip".to_string(),
        description: "A clip".to_string(),
    }
}

pub struct Harness {
    pub storage: MemoryStorage,
    pub repo: MemoryRepository,
    pub runner: FakeRunner,
    pub scratch: tempfile::TempDir,
    pub orchestrator: PipelineOrchestrator<MemoryStorage, MemoryRepository, FakeRunner>,
}

impl Harness {
    pub fn new(runner: FakeRunner) -> Self {
        Self::with_config(runner, |_| {})
    }

    pub fn with_config(runner: FakeRunner, configure: impl FnOnce(&mut PipelineConfig)) -> Self {
        let storage = MemoryStorage::with_source();
        let repo = MemoryRepository::default();
        let scratch = tempfile::tempdir().unwrap();

        let mut config = PipelineConfig::new(CDN, scratch.path());
        configure(&mut config);

        let orchestrator =
            PipelineOrchestrator::new(storage.clone(), repo.clone(), runner.clone(), config);
        Self {
            storage,
            repo,
            runner,
            scratch,
            orchestrator,
        }
    }

    /// Scratch root must be empty once a run has returned.
    pub fn assert_scratch_clean(&self) {
        let leftovers: Vec<_> = std::fs::read_dir(self.scratch.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(leftovers.is_empty(), "scratch not cleaned: {leftovers:?}");
    }
}
