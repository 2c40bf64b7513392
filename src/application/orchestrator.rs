use crate::application::storage::StorageGateway;
use crate::application::workspace::ScratchWorkspace;
use crate::config::PipelineConfig;
use crate::domain::av::ladder::{RenditionLadder, RenditionSpec};
use crate::domain::av::probe::MediaProbe;
use crate::domain::av::thumbnails::ThumbnailExtractor;
use crate::domain::av::transcode::{Transcoder, RENDITION_PLAYLIST_NAME};
use crate::domain::hls::{ManifestBuilder, MasterManifest, RenditionOutput};
use crate::domain::jobs::{
    PipelineReport, PipelineState, RunOutcome, SourceAsset, VideoMetadataRecord,
};
use crate::error::{EncodeError, PersistError, PipelineError, StorageError};
use crate::ports::process::ProcessRunner;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::StoragePort;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Drives one upload through fetch, probe, encode, manifest, thumbnail and
/// persist. Holds no per-run state, so one instance serves every run.
pub struct PipelineOrchestrator<S, P, R> {
    storage: StorageGateway<S>,
    repo: P,
    runner: R,
    probe: MediaProbe,
    transcoder: Transcoder,
    thumbnails: ThumbnailExtractor,
    config: PipelineConfig,
}

impl<S, P, R> PipelineOrchestrator<S, P, R>
where
    S: StoragePort,
    P: VideoRepository,
    R: ProcessRunner,
{
    pub fn new(storage: S, repo: P, runner: R, config: PipelineConfig) -> Self {
        let probe = MediaProbe::new(config.ffprobe_path.clone(), config.timeouts.probe);
        let transcoder = Transcoder::new(
            config.ffmpeg_path.clone(),
            config.segment_seconds,
            config.timeouts.encode,
        );
        let thumbnails = ThumbnailExtractor::new(
            config.ffmpeg_path.clone(),
            config.thumbnail_offset_seconds,
            config.timeouts.thumbnail,
        );

        Self {
            storage: StorageGateway::new(storage, config.cdn_base_url.clone()),
            repo,
            runner,
            probe,
            transcoder,
            thumbnails,
            config,
        }
    }

    /// Runs the pipeline for one asset. The scratch workspace is gone by the
    /// time this returns, whatever the outcome.
    pub async fn run(&self, asset: &SourceAsset) -> Result<RunOutcome, PipelineError> {
        let span = info_span!(
            "pipeline",
            video_id = %asset.video_id,
            run_id = %Uuid::new_v4()
        );
        self.run_in_span(asset).instrument(span).await
    }

    async fn run_in_span(&self, asset: &SourceAsset) -> Result<RunOutcome, PipelineError> {
        enter(PipelineState::Fetching);

        let result = self.guarded(asset).await;
        match &result {
            Ok(RunOutcome::Completed(report)) => {
                enter(PipelineState::Done);
                info!(
                    renditions = ?report.renditions,
                    dropped = report.failed_renditions.len(),
                    thumbnail_missing = report.thumbnail_missing,
                    "pipeline finished"
                );
            }
            Ok(RunOutcome::Skipped { .. }) => {}
            Err(e) => {
                enter(PipelineState::Failed);
                error!(failed_at = %e.state(), error = %e, "pipeline failed");
            }
        }
        result
    }

    async fn guarded(&self, asset: &SourceAsset) -> Result<RunOutcome, PipelineError> {
        asset.validate().map_err(PipelineError::InvalidAsset)?;

        let existing = self
            .repo
            .find_by_video_id(&asset.video_id)
            .await
            .map_err(|e| PipelineError::Lookup(PersistError::Backend(e)))?;
        if existing.is_some() {
            info!("metadata record already exists, skipping");
            return Ok(RunOutcome::Skipped {
                video_id: asset.video_id.clone(),
            });
        }

        let workspace = ScratchWorkspace::acquire(&self.config.scratch_root, &asset.video_id)
            .map_err(PipelineError::Workspace)?;

        let result = self.process(asset, &workspace).await;

        if let Err(e) = workspace.release() {
            warn!(error = %e, "failed to remove scratch workspace");
        }
        result.map(RunOutcome::Completed)
    }

    async fn process(
        &self,
        asset: &SourceAsset,
        workspace: &ScratchWorkspace,
    ) -> Result<PipelineReport, PipelineError> {
        let source = self
            .storage
            .download(&asset.storage_key, workspace.path())
            .await
            .map_err(|source| PipelineError::Download {
                key: asset.storage_key.clone(),
                source,
            })?;

        enter(PipelineState::Probing);
        let probe = self.probe.probe(&self.runner, &source).await?;

        enter(PipelineState::Encoding);
        if self.config.purge_stale_outputs {
            let removed = self
                .storage
                .purge_prefix(&asset.output_prefix())
                .await
                .map_err(PipelineError::Purge)?;
            if removed > 0 {
                info!(removed, "purged stale outputs");
            }
        }

        let selected = RenditionLadder::select(&self.config.renditions, &probe);
        if selected.is_empty() {
            error!(
                source_resolution = %probe.resolution(),
                "source is smaller than every rendition"
            );
            return Err(PipelineError::NoRenditions { attempted: 0 });
        }

        let source_path = source.as_path();
        let results: Vec<Result<RenditionOutput, EncodeError>> = stream::iter(selected.iter().cloned())
            .map(move |spec| async move {
                self.publish_rendition(asset, source_path, &spec, workspace)
                    .await
            })
            .buffered(self.config.rendition_concurrency.max(1))
            .collect()
            .await;

        let mut outputs = Vec::with_capacity(results.len());
        let mut failed_renditions = Vec::new();
        for result in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    warn!(rendition = %e.rendition, error = %e, "dropping rendition");
                    failed_renditions.push((e.rendition.clone(), e.kind.to_string()));
                }
            }
        }
        if outputs.is_empty() {
            return Err(PipelineError::NoRenditions {
                attempted: selected.len(),
            });
        }

        enter(PipelineState::ManifestBuilding);
        let manifest = MasterManifest {
            content: ManifestBuilder::build(&outputs, &self.config.cdn_base_url)?,
            storage_path: asset.master_playlist_key(),
        };
        let manifest_url = self.publish_manifest(&manifest, workspace).await?;

        enter(PipelineState::ThumbnailGenerating);
        let thumbnail_url = self
            .publish_thumbnail(asset, &source, probe.duration_seconds, workspace)
            .await;

        enter(PipelineState::Persisting);
        let record = VideoMetadataRecord::new(
            asset,
            &probe,
            self.storage.url_for(&asset.storage_key),
            manifest_url,
            thumbnail_url,
        );
        match self.repo.insert_if_absent(&record).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(PipelineError::Persist(PersistError::AlreadyExists {
                    video_id: asset.video_id.clone(),
                }))
            }
            Err(e) => return Err(PipelineError::Persist(PersistError::Backend(e))),
        }

        Ok(PipelineReport {
            video_id: asset.video_id.clone(),
            renditions: outputs.iter().map(|o| o.spec.name.clone()).collect(),
            failed_renditions,
            thumbnail_missing: record.thumbnail_path.is_none(),
            record,
        })
    }

    /// Encode and upload one rung. Any error here only drops the rung.
    async fn publish_rendition(
        &self,
        asset: &SourceAsset,
        source: &Path,
        spec: &RenditionSpec,
        workspace: &ScratchWorkspace,
    ) -> Result<RenditionOutput, EncodeError> {
        let encoded = self
            .transcoder
            .encode(&self.runner, source, spec, &workspace.rendition_dir(&spec.name))
            .await?;

        let prefix = format!("{}/{}", asset.output_prefix(), spec.name);
        self.storage
            .upload_all(&encoded.files, &prefix)
            .await
            .map_err(|e| EncodeError::new(&spec.name, e))?;

        // Segments are on the object store now; free the disk early.
        if let Err(e) = tokio::fs::remove_dir_all(&encoded.output_dir).await {
            debug!(rendition = %spec.name, error = %e, "could not remove rendition dir early");
        }

        info!(rendition = %spec.name, files = encoded.files.len(), "rendition published");
        Ok(RenditionOutput::new(
            spec.clone(),
            format!("{}/{}", prefix, RENDITION_PLAYLIST_NAME),
        ))
    }

    async fn publish_manifest(
        &self,
        manifest: &MasterManifest,
        workspace: &ScratchWorkspace,
    ) -> Result<String, PipelineError> {
        let local = workspace.manifest_path();
        tokio::fs::write(&local, manifest.content.as_bytes())
            .await
            .map_err(|source| {
                PipelineError::ManifestUpload(StorageError::Io {
                    path: local.clone(),
                    source,
                })
            })?;
        self.storage
            .upload(&local, &manifest.storage_path)
            .await
            .map_err(PipelineError::ManifestUpload)
    }

    /// Best-effort: a missing thumbnail never fails the run.
    async fn publish_thumbnail(
        &self,
        asset: &SourceAsset,
        source: &Path,
        duration_seconds: f64,
        workspace: &ScratchWorkspace,
    ) -> Option<String> {
        let local = match self
            .thumbnails
            .extract(
                &self.runner,
                source,
                &workspace.thumbnail_path(),
                Some(duration_seconds),
            )
            .await
        {
            Ok(local) => local,
            Err(e) => {
                warn!(error = %e, "thumbnail extraction failed, continuing without");
                return None;
            }
        };

        match self.storage.upload(&local, &asset.thumbnail_key()).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "thumbnail upload failed, continuing without");
                None
            }
        }
    }
}

fn enter(state: PipelineState) {
    info!(state = %state, "state transition");
}
