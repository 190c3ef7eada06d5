// Error types for the download flow

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// A required external tool is missing from the system
    #[error("{0} was not found on this system")]
    ToolNotFound(String),

    /// The tool did not respond in time
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    /// yt-dlp rejected the URL
    #[error("invalid or unsupported URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse yt-dlp JSON output
    #[error("could not parse yt-dlp output: {0}")]
    Parse(String),

    /// Spawning or waiting on the subprocess failed
    #[error("failed to run {tool}: {source}")]
    Process {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure surfaced by yt-dlp itself
    #[error("yt-dlp reported an error: {0}")]
    Tool(String),
}

impl DownloadError {
    /// Classify raw yt-dlp stderr into a variant.
    pub fn classify(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout(summarize(stderr));
        }

        if lower.contains("ffmpeg") && (lower.contains("not found") || lower.contains("not installed")) {
            return Self::ToolNotFound("ffmpeg".to_string());
        }

        if lower.contains("not found")
            || lower.contains("no such file")
            || lower.contains("command not found")
        {
            return Self::ToolNotFound(summarize(stderr));
        }

        if lower.contains("unsupported url") || lower.contains("is not a valid url") {
            return Self::InvalidUrl(summarize(stderr));
        }

        Self::Tool(summarize(stderr))
    }

    /// One-line suggestion printed under the error message, when one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound(tool) if tool.contains("ffmpeg") => Some(
                "Merging and MP3 conversion need ffmpeg. Install it or pass --ffmpeg-location.",
            ),
            Self::ToolNotFound(_) => Some("Install yt-dlp and make sure it is on PATH."),
            Self::NetworkTimeout(_) => {
                Some("Check the URL and your connection. The site may be unreachable right now.")
            }
            Self::InvalidUrl(_) => {
                Some("The address must be a full http(s) URL of a site yt-dlp supports.")
            }
            Self::Tool(msg) if msg.to_lowercase().contains("ffmpeg") => Some(
                "The chosen format needs merging or conversion. Check that ffmpeg is installed and on PATH.",
            ),
            _ => None,
        }
    }
}

/// Pick the most useful line out of a stderr dump: the first ERROR line,
/// otherwise the last non-empty one.
fn summarize(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).filter(|l| !l.is_empty()).next_back())
        .unwrap_or("no error output")
        .to_string()
}
