// FormatSelector - maps a menu choice onto a yt-dlp format selector
// expression and the post-processing directive that goes with it.

use super::models::FormatChoice;

/// What yt-dlp should do after the raw streams are on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Nothing; the downloaded file is final
    None,
    /// Merge separate video and audio streams into an MP4 container
    MergeMp4,
    /// Extract the audio track and transcode it to MP3
    ExtractMp3,
}

/// A fully resolved selection, ready to become command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPlan {
    pub selector: String,
    pub postprocess: PostProcess,
}

/// MP3 bitrate handed to the audio extractor.
pub const MP3_QUALITY: &str = "192K";

pub struct FormatSelector;

impl FormatSelector {
    /// Build the plan for a choice. Listing is resolved to a manual ID
    /// before a plan is ever built, so it maps to the default here.
    pub fn plan(choice: &FormatChoice) -> FormatPlan {
        match choice {
            FormatChoice::BestOverall | FormatChoice::ListFormats => FormatPlan {
                selector: "bestvideo+bestaudio/best".to_string(),
                postprocess: PostProcess::MergeMp4,
            },
            FormatChoice::BestMp4 => FormatPlan {
                selector: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
                postprocess: PostProcess::MergeMp4,
            },
            FormatChoice::BestAudioOriginal => FormatPlan {
                selector: "bestaudio/best".to_string(),
                postprocess: PostProcess::None,
            },
            FormatChoice::BestAudioAsMp3 => FormatPlan {
                selector: "bestaudio/best".to_string(),
                postprocess: PostProcess::ExtractMp3,
            },
            FormatChoice::Manual(id) => FormatPlan {
                selector: id.clone(),
                // "137+140" style combos download two streams that must be merged
                postprocess: if id.contains('+') || id.contains("bestvideo") {
                    PostProcess::MergeMp4
                } else {
                    PostProcess::None
                },
            },
        }
    }
}
