// External tool discovery: yt-dlp and ffmpeg

use std::process::Command;
use tracing::{debug, warn};

/// Well-known install locations checked before falling back to PATH.
const YTDLP_PATHS: [&str; 3] = [
    "/opt/homebrew/bin/yt-dlp",
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
];

/// Find the yt-dlp binary: well-known paths first, then PATH via `which`.
pub fn locate_ytdlp() -> Option<String> {
    for path in YTDLP_PATHS {
        if std::path::Path::new(path).exists() {
            debug!(path, "found yt-dlp at well-known location");
            return Some(path.to_string());
        }
    }
    which("yt-dlp")
}

/// Find ffmpeg. An explicit override always wins; otherwise search PATH.
/// ffmpeg is never invoked directly here, yt-dlp gets the location.
pub fn locate_ffmpeg(override_path: Option<&str>) -> Option<String> {
    if let Some(path) = override_path {
        if !std::path::Path::new(path).exists() {
            warn!(path, "configured ffmpeg location does not exist; passing it through anyway");
        }
        return Some(path.to_string());
    }
    which("ffmpeg")
}

/// First line of `<tool> --version`, when the tool runs at all.
pub fn version_of(path: &str) -> Option<String> {
    match Command::new(path).arg("--version").output() {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .lines()
            .next()
            .map(|l| l.trim().to_string()),
        _ => None,
    }
}

fn which(binary: &str) -> Option<String> {
    let output = Command::new("which").arg(binary).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}
