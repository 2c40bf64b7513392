use crate::domain::jobs::{MASTER_PLAYLIST_NAME, THUMBNAIL_NAME};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Per-run local directory for the source copy and every intermediate file.
///
/// The directory is removed when the handle is released or dropped, so no
/// exit path of a run can leave it behind.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Creates `video_{id}_XXXX` under `root`. The random suffix keeps two
    /// runs for the same video from sharing a directory.
    pub fn acquire(root: &Path, video_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("video_{}_", video_id))
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "acquired scratch workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn rendition_dir(&self, rendition: &str) -> PathBuf {
        self.dir.path().join(rendition)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join(MASTER_PLAYLIST_NAME)
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.dir.path().join(THUMBNAIL_NAME)
    }

    /// Removes the directory now and reports failure, unlike a plain drop.
    pub fn release(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(path = %path.display(), "released scratch workspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::acquire(root.path(), "42").unwrap();
        let path = workspace.path().to_path_buf();

        std::fs::create_dir_all(workspace.rendition_dir("240p")).unwrap();
        std::fs::write(workspace.rendition_dir("240p").join("segment_000.ts"), b"ts").unwrap();
        assert!(path.starts_with(root.path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("video_42_"));

        workspace.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let workspace = ScratchWorkspace::acquire(root.path(), "7").unwrap();
            std::fs::write(workspace.thumbnail_path(), b"jpg").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_runs_get_separate_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchWorkspace::acquire(root.path(), "9").unwrap();
        let b = ScratchWorkspace::acquire(root.path(), "9").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.manifest_path().file_name().unwrap(), "master.m3u8");
    }
}
