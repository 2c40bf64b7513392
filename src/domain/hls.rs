//! HLS playlists: the per-rendition media playlist written by the encoder and
//! the master playlist published for players.

use crate::domain::av::ladder::RenditionSpec;
use crate::error::{ManifestError, PlaylistError};
use regex::Regex;
use std::sync::LazyLock;

static EXTINF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#EXTINF:([0-9]+(?:\.[0-9]+)?)\s*(?:,.*)?$").expect("valid EXTINF pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub duration: f64,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub version: u8,
    pub target_duration: u64,
    pub segments: Vec<MediaSegment>,
    pub end_list: bool,
    pub playlist_type: Option<String>,
}

impl MediaPlaylist {
    pub fn new(target_duration: u64) -> Self {
        Self {
            version: 3,
            target_duration,
            segments: Vec::new(),
            end_list: true,
            playlist_type: None,
        }
    }

    pub fn add_segment(&mut self, duration: f64, uri: String) {
        self.segments.push(MediaSegment { duration, uri });
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn parse(text: &str) -> Result<Self, PlaylistError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        match lines.next() {
            Some((_, "#EXTM3U")) => {}
            _ => return Err(PlaylistError::MissingHeader),
        }

        let mut playlist = MediaPlaylist::new(0);
        playlist.version = 1;
        playlist.end_list = false;
        let mut pending_duration: Option<f64> = None;

        for (number, line) in lines {
            let malformed = || PlaylistError::MalformedTag {
                line: number,
                content: line.to_string(),
            };

            if line.starts_with("#EXTINF:") {
                let caps = EXTINF.captures(line).ok_or_else(|| malformed())?;
                let duration = caps[1].parse::<f64>().map_err(|_| malformed())?;
                pending_duration = Some(duration);
            } else if let Some(value) = line.strip_prefix("#EXT-X-VERSION:") {
                playlist.version = value.parse().map_err(|_| malformed())?;
            } else if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
                playlist.target_duration = value.parse().map_err(|_| malformed())?;
            } else if let Some(value) = line.strip_prefix("#EXT-X-PLAYLIST-TYPE:") {
                playlist.playlist_type = Some(value.to_string());
            } else if line == "#EXT-X-ENDLIST" {
                playlist.end_list = true;
            } else if line.starts_with('#') {
                // Unknown tags and comments are allowed by the format.
            } else {
                let duration = pending_duration.take().ok_or(PlaylistError::OrphanUri(number))?;
                playlist.add_segment(duration, line.to_string());
            }
        }

        Ok(playlist)
    }

    /// A finished video-on-demand playlist: segments present and terminated.
    pub fn validate_vod(&self) -> Result<(), PlaylistError> {
        if self.segments.is_empty() {
            return Err(PlaylistError::Empty);
        }
        if !self.end_list {
            return Err(PlaylistError::NotEnded);
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("#EXTM3U\n");
        out.push_str(&format!("#EXT-X-VERSION:{}\n", self.version));
        out.push_str(&format!("#EXT-X-TARGETDURATION:{}\n", self.target_duration));
        out.push_str("#EXT-X-MEDIA-SEQUENCE:0\n");

        if let Some(pt) = &self.playlist_type {
            out.push_str(&format!("#EXT-X-PLAYLIST-TYPE:{}\n", pt));
        }

        for segment in &self.segments {
            out.push_str(&format!("#EXTINF:{:.6},\n", segment.duration));
            out.push_str(&segment.uri);
            out.push('\n');
        }

        if self.end_list {
            out.push_str("#EXT-X-ENDLIST\n");
        }

        out
    }
}

/// A rung that was encoded and uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RenditionOutput {
    pub spec: RenditionSpec,
    /// Storage key of the rendition playlist, relative to the bucket root.
    pub rendition_playlist_storage_path: String,
    pub bandwidth_bits_per_sec: u64,
    pub resolution_string: String,
}

impl RenditionOutput {
    pub fn new(spec: RenditionSpec, rendition_playlist_storage_path: String) -> Self {
        Self {
            bandwidth_bits_per_sec: spec.bandwidth(),
            resolution_string: spec.resolution(),
            rendition_playlist_storage_path,
            spec,
        }
    }
}

/// The published `master.m3u8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterManifest {
    pub content: String,
    pub storage_path: String,
}

/// Joins a CDN base and a storage key with exactly one slash between them.
pub fn cdn_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

pub struct ManifestBuilder;

impl ManifestBuilder {
    /// Renditions are listed in the order given; no sorting is applied.
    pub fn build(
        renditions: &[RenditionOutput],
        cdn_base_url: &str,
    ) -> Result<String, ManifestError> {
        if renditions.is_empty() {
            return Err(ManifestError::NoRenditions);
        }

        let mut content = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
        for rendition in renditions {
            content.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\n{}\n",
                rendition.bandwidth_bits_per_sec,
                rendition.resolution_string,
                cdn_url(cdn_base_url, &rendition.rendition_playlist_storage_path)
            ));
        }
        Ok(content)
    }
}
