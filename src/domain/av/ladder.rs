use super::probe::ProbeResult;
use serde::{Deserialize, Serialize};

/// One rung of the encoding ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    pub name: String,
    pub target_width: u32,
    pub target_height: u32,
    pub video_bitrate_kbps: u32,
    /// Passed to the encoder verbatim, e.g. `128k`.
    pub audio_bitrate: String,
}

impl RenditionSpec {
    pub fn new(
        name: impl Into<String>,
        target_width: u32,
        target_height: u32,
        video_bitrate_kbps: u32,
        audio_bitrate: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_width,
            target_height,
            video_bitrate_kbps,
            audio_bitrate: audio_bitrate.into(),
        }
    }

    /// `BANDWIDTH` attribute value in bits per second.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.video_bitrate_kbps) * 1000
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.target_width, self.target_height)
    }

    /// Encoder rate ceiling: 1.2x the target bitrate.
    pub fn max_rate_kbps(&self) -> u32 {
        (f64::from(self.video_bitrate_kbps) * 1.2).round() as u32
    }

    /// Decoder buffer: 2x the target bitrate.
    pub fn buffer_size_kbps(&self) -> u32 {
        self.video_bitrate_kbps.saturating_mul(2)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.target_width <= width && self.target_height <= height
    }
}

/// Ladder used when no override is configured, lowest quality first.
pub fn default_ladder() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec::new("240p", 426, 240, 800, "96k"),
        RenditionSpec::new("360p", 640, 360, 1200, "128k"),
        RenditionSpec::new("720p", 1280, 720, 3000, "128k"),
    ]
}

pub struct RenditionLadder;

impl RenditionLadder {
    /// Keeps the candidates that do not upscale the source in either axis,
    /// in candidate order. An empty result is returned as-is; a source
    /// smaller than every rung yields no renditions.
    pub fn select(candidates: &[RenditionSpec], source: &ProbeResult) -> Vec<RenditionSpec> {
        candidates
            .iter()
            .filter(|spec| spec.fits_within(source.width, source.height))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(width: u32, height: u32) -> ProbeResult {
        ProbeResult {
            width,
            height,
            duration_seconds: 10.0,
            container_format: "mp4".to_string(),
            video_codec: "h264".to_string(),
            audio_codec: None,
            frame_rate: "30/1".to_string(),
            bit_rate: None,
            original_file_size_bytes: 0,
        }
    }

    fn names(specs: &[RenditionSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_select_640x360() {
        let selected = RenditionLadder::select(&default_ladder(), &source(640, 360));
        assert_eq!(names(&selected), vec!["240p", "360p"]);
    }

    #[test]
    fn test_select_full_hd_keeps_all_in_order() {
        let selected = RenditionLadder::select(&default_ladder(), &source(1920, 1080));
        assert_eq!(names(&selected), vec!["240p", "360p", "720p"]);
    }

    #[test]
    fn test_select_portrait_source() {
        // 1080x1920 is too narrow for 1280 wide but tall enough for everything.
        let selected = RenditionLadder::select(&default_ladder(), &source(1080, 1920));
        assert_eq!(names(&selected), vec!["240p", "360p"]);
    }

    #[test]
    fn test_select_too_small_is_empty() {
        let selected = RenditionLadder::select(&default_ladder(), &source(320, 180));
        assert!(selected.is_empty());
    }

    #[test]
    fn test_select_preserves_candidate_order() {
        let candidates = vec![
            RenditionSpec::new("b", 640, 360, 1200, "128k"),
            RenditionSpec::new("a", 426, 240, 800, "96k"),
            RenditionSpec::new("c", 4000, 4000, 9000, "192k"),
        ];
        let selected = RenditionLadder::select(&candidates, &source(1280, 720));
        assert_eq!(names(&selected), vec!["b", "a"]);
    }

    #[test]
    fn test_selected_never_exceeds_source() {
        for (w, h) in [(100, 100), (426, 240), (427, 239), (1280, 720), (3840, 2160)] {
            for spec in RenditionLadder::select(&default_ladder(), &source(w, h)) {
                assert!(spec.target_width <= w && spec.target_height <= h);
            }
        }
    }

    #[test]
    fn test_rate_derivations() {
        let spec = RenditionSpec::new("240p", 426, 240, 800, "96k");
        assert_eq!(spec.bandwidth(), 800_000);
        assert_eq!(spec.max_rate_kbps(), 960);
        assert_eq!(spec.buffer_size_kbps(), 1600);
        assert_eq!(spec.resolution(), "426x240");

        let odd = RenditionSpec::new("odd", 2, 2, 1001, "64k");
        assert_eq!(odd.max_rate_kbps(), 1201);
    }
}
