// Common data models for the download flow

use serde::Deserialize;
use std::path::PathBuf;

/// Quality/format menu selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatChoice {
    /// Highest quality video+audio in any container (menu 1 and the 0/blank default)
    BestOverall,
    /// Highest quality video+audio constrained to MP4
    BestMp4,
    /// Highest quality audio-only stream, original container
    BestAudioOriginal,
    /// Highest quality audio-only stream, transcoded to MP3
    BestAudioAsMp3,
    /// Listing mode: show every format, then ask for an ID
    ListFormats,
    /// A format ID typed after listing, passed to yt-dlp verbatim
    Manual(String),
}

impl FormatChoice {
    /// Parse a menu answer. Blank and "0" both mean the default option;
    /// anything outside 0-5 is rejected so the caller can re-prompt.
    pub fn parse_menu(input: &str) -> Option<Self> {
        match input.trim() {
            "" | "0" | "1" => Some(Self::BestOverall),
            "2" => Some(Self::BestMp4),
            "3" => Some(Self::BestAudioOriginal),
            "4" => Some(Self::BestAudioAsMp3),
            "5" => Some(Self::ListFormats),
            _ => None,
        }
    }
}

/// One download attempt. Built fresh per loop iteration, never stored.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub dest_dir: PathBuf,
    pub choice: FormatChoice,
}

/// Rough shape of a stream as reported by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    VideoAudio,
    VideoOnly,
    AudioOnly,
}

impl StreamKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::VideoAudio => "video+audio",
            Self::VideoOnly => "video only",
            Self::AudioOnly => "audio only",
        }
    }
}

/// A single format from yt-dlp's JSON dump. Lives only for one
/// listing round-trip.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    pub resolution: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub abr: Option<f64>,
    pub format_note: Option<String>,
}

impl FormatDescriptor {
    /// Exact size when known, approximate otherwise.
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    /// None for metadata-only entries (storyboards, thumbnails), which
    /// are dropped from the listing.
    pub fn kind(&self) -> Option<StreamKind> {
        let has_video = self.vcodec.as_deref().map_or(false, |v| v != "none");
        let has_audio = self.acodec.as_deref().map_or(false, |a| a != "none");
        match (has_video, has_audio) {
            (true, true) => Some(StreamKind::VideoAudio),
            (true, false) => Some(StreamKind::VideoOnly),
            (false, true) => Some(StreamKind::AudioOnly),
            (false, false) => None,
        }
    }
}

/// One entry of a playlist dump. Only the fields the filters and the
/// sequential dispatch need.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Seconds; absent for some live or flat entries
    pub duration: Option<f64>,
    /// YYYYMMDD as emitted by yt-dlp
    pub upload_date: Option<String>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
}

impl VideoEntry {
    pub fn target_url(&self) -> Option<&str> {
        self.webpage_url.as_deref().or(self.url.as_deref())
    }
}

/// Progress snapshot parsed from one yt-dlp output line.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}
