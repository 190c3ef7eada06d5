// Progress reporting: parse yt-dlp --newline output and drive a terminal bar
//
// yt-dlp emits lines like:
// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

use super::models::DownloadProgress;

/// Parse one output line into a progress snapshot, when it carries one.
pub fn parse_progress_line(line: &str) -> Option<DownloadProgress> {
    lazy_static::lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)\s+at\s+(\d+\.?\d*\s*\w+/s)(?:\s+ETA\s+(\S+))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger\]\s+Merging").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str()).unwrap_or("?");
        let eta = caps.get(4).map(|m| m.as_str()).unwrap_or("");

        let status = if eta.is_empty() {
            format!("{percent:.1}% of {size} at {speed}")
        } else {
            format!("{percent:.1}% of {size} at {speed} ETA {eta}")
        };
        return Some(DownloadProgress { percent, status });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        let short: String = filename
            .rsplit('/')
            .next()
            .unwrap_or(filename)
            .chars()
            .take(50)
            .collect();
        return Some(DownloadProgress {
            percent: 0.0,
            status: format!("downloading {short}"),
        });
    }

    if MERGE_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 99.0,
            status: "merging video and audio".to_string(),
        });
    }

    if ALREADY_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 100.0,
            status: "file already downloaded".to_string(),
        });
    }

    None
}

/// Terminal progress bar fed by parsed snapshots.
pub struct ProgressRenderer {
    bar: ProgressBar,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {wide_msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    pub fn apply(&self, update: DownloadProgress) {
        self.bar.set_position(update.percent.round() as u64);
        self.bar.set_message(update.status);
    }

    /// Clear the bar so the final message prints on a clean line.
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}
