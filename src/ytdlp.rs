// yt-dlp invocation layer. Exactly two operations are consumed: fetch a
// URL with a format plan, and probe a URL for its formats or playlist
// entries. Extraction, merging and transcoding all happen inside yt-dlp
// and ffmpeg.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info};

use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::{FormatPlan, FormatSelector, PostProcess, MP3_QUALITY};
use crate::downloader::models::{DownloadRequest, FormatDescriptor, VideoEntry};
use crate::downloader::progress::{parse_progress_line, ProgressRenderer};
use crate::downloader::tools;
use crate::downloader::utils::run_output_with_timeout;

/// Title plus video ID, so equal titles cannot overwrite each other.
const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Deadline for a single-video probe.
const PROBE_TIMEOUT_SECS: u64 = 60;
/// Playlists resolve one entry at a time and can take far longer.
const PLAYLIST_PROBE_TIMEOUT_SECS: u64 = 300;

/// A located yt-dlp binary plus the ffmpeg location passed through to it.
pub struct Ytdlp {
    path: String,
    ffmpeg_location: Option<String>,
}

/// What a probed URL turned out to be.
#[derive(Debug)]
pub enum Probe {
    Single(VideoEntry),
    Playlist { title: String, entries: Vec<VideoEntry> },
}

/// Shape of `yt-dlp -J` output; `entries` is present for playlists only.
/// Null entries appear for videos the extractor could not resolve.
#[derive(Debug, Deserialize)]
struct ProbeDump {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    upload_date: Option<String>,
    webpage_url: Option<String>,
    entries: Option<Vec<Option<VideoEntry>>>,
}

#[derive(Debug, Deserialize)]
struct FormatDump {
    #[serde(default)]
    formats: Vec<FormatDescriptor>,
}

impl Ytdlp {
    /// Locate the binary, failing early when it is not installed.
    pub fn locate(ffmpeg_override: Option<&str>) -> Result<Self, DownloadError> {
        let path = tools::locate_ytdlp()
            .ok_or_else(|| DownloadError::ToolNotFound("yt-dlp".to_string()))?;
        let ffmpeg_location = tools::locate_ffmpeg(ffmpeg_override);
        debug!(path, ffmpeg = ?ffmpeg_location, "external tools located");
        Ok(Self {
            path,
            ffmpeg_location,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ffmpeg_location(&self) -> Option<&str> {
        self.ffmpeg_location.as_deref()
    }

    /// Download one URL to completion, streaming yt-dlp's progress lines
    /// into a terminal bar. Blocks until the tool exits.
    pub fn fetch(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        let plan = FormatSelector::plan(&request.choice);
        let args = self.fetch_args(request, &plan);
        info!(url = %request.url, selector = %plan.selector, "spawning yt-dlp");

        let mut child = Command::new(&self.path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DownloadError::Process {
                tool: "yt-dlp".to_string(),
                source: e,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Tool("could not capture yt-dlp stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Tool("could not capture yt-dlp stderr".to_string()))?;

        // stderr is drained from its own thread so the child never blocks
        // on a full pipe while stdout is being read
        let stderr_handle = std::thread::spawn(move || {
            let mut lines = Vec::new();
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                lines.push(line);
            }
            lines.join("\n")
        });

        let renderer = ProgressRenderer::new();
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            debug!(%line, "yt-dlp");
            if let Some(update) = parse_progress_line(&line) {
                renderer.apply(update);
            }
        }
        renderer.clear();

        let status = child.wait().map_err(|e| DownloadError::Process {
            tool: "yt-dlp".to_string(),
            source: e,
        })?;
        let stderr_output = stderr_handle.join().unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::classify(&stderr_output))
        }
    }

    /// List the formats available for one video, metadata-only entries
    /// already dropped.
    pub async fn list_formats(&self, url: &str) -> Result<Vec<FormatDescriptor>, DownloadError> {
        let args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            "--socket-timeout".to_string(),
            "15".to_string(),
            url.to_string(),
        ];
        let output = run_output_with_timeout(&self.path, &args, PROBE_TIMEOUT_SECS).await?;
        if !output.status.success() {
            return Err(DownloadError::classify(&String::from_utf8_lossy(
                &output.stderr,
            )));
        }
        parse_formats(&output.stdout)
    }

    /// Resolve a URL into either a single video or a playlist of entries.
    pub async fn probe(&self, url: &str) -> Result<Probe, DownloadError> {
        let args = vec![
            "-J".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            "--socket-timeout".to_string(),
            "15".to_string(),
            url.to_string(),
        ];
        let output =
            run_output_with_timeout(&self.path, &args, PLAYLIST_PROBE_TIMEOUT_SECS).await?;
        if !output.status.success() {
            return Err(DownloadError::classify(&String::from_utf8_lossy(
                &output.stderr,
            )));
        }
        parse_probe(&output.stdout, url)
    }

    /// The full argument vector for one download.
    fn fetch_args(&self, request: &DownloadRequest, plan: &FormatPlan) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            plan.selector.clone(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--no-check-certificates".to_string(),
            "-P".to_string(),
            request.dest_dir.to_string_lossy().into_owned(),
            "-o".to_string(),
            OUTPUT_TEMPLATE.to_string(),
        ];

        match plan.postprocess {
            PostProcess::None => {}
            PostProcess::MergeMp4 => {
                args.push("--merge-output-format".to_string());
                args.push("mp4".to_string());
            }
            PostProcess::ExtractMp3 => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push("mp3".to_string());
                args.push("--audio-quality".to_string());
                args.push(MP3_QUALITY.to_string());
            }
        }

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.clone());
        }

        args.push(request.url.clone());
        args
    }
}

fn parse_formats(stdout: &[u8]) -> Result<Vec<FormatDescriptor>, DownloadError> {
    let dump: FormatDump =
        serde_json::from_slice(stdout).map_err(|e| DownloadError::Parse(e.to_string()))?;
    Ok(dump
        .formats
        .into_iter()
        .filter(|f| f.kind().is_some())
        .collect())
}

fn parse_probe(stdout: &[u8], url: &str) -> Result<Probe, DownloadError> {
    let dump: ProbeDump =
        serde_json::from_slice(stdout).map_err(|e| DownloadError::Parse(e.to_string()))?;
    Ok(match dump.entries {
        Some(entries) => Probe::Playlist {
            title: dump.title.unwrap_or_else(|| "untitled playlist".to_string()),
            entries: entries.into_iter().flatten().collect(),
        },
        None => Probe::Single(VideoEntry {
            id: dump.id.unwrap_or_default(),
            title: dump.title.unwrap_or_default(),
            duration: dump.duration,
            upload_date: dump.upload_date,
            webpage_url: dump.webpage_url.or_else(|| Some(url.to_string())),
            url: None,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::FormatChoice;
    use std::path::PathBuf;

    fn runner() -> Ytdlp {
        Ytdlp {
            path: "yt-dlp".to_string(),
            ffmpeg_location: None,
        }
    }

    fn request(choice: FormatChoice) -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/v/1".to_string(),
            dest_dir: PathBuf::from("/tmp/out"),
            choice,
        }
    }

    fn args_for(choice: FormatChoice) -> Vec<String> {
        let req = request(choice);
        let plan = FormatSelector::plan(&req.choice);
        runner().fetch_args(&req, &plan)
    }

    #[test]
    fn baseline_args_cover_template_and_destination() {
        let args = args_for(FormatChoice::BestOverall);
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "bestvideo+bestaudio/best");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"/tmp/out".to_string()));
        assert!(args.contains(&OUTPUT_TEMPLATE.to_string()));
        // URL goes last
        assert_eq!(args.last().unwrap(), "https://example.com/v/1");
    }

    #[test]
    fn best_overall_merges_to_mp4() {
        let args = args_for(FormatChoice::BestOverall);
        let at = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[at + 1], "mp4");
    }

    #[test]
    fn mp3_choice_adds_the_extraction_directive() {
        let args = args_for(FormatChoice::BestAudioAsMp3);
        assert_eq!(args[1], "bestaudio/best");
        let at = args.iter().position(|a| a == "-x").unwrap();
        assert_eq!(args[at + 1], "--audio-format");
        assert_eq!(args[at + 2], "mp3");
        assert!(args.contains(&MP3_QUALITY.to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn audio_original_has_no_postprocessing_args() {
        let args = args_for(FormatChoice::BestAudioOriginal);
        assert!(!args.contains(&"-x".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn manual_id_is_the_selector_verbatim() {
        let args = args_for(FormatChoice::Manual("137+140".to_string()));
        assert_eq!(args[1], "137+140");
        // combined streams still get merged
        assert!(args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn ffmpeg_location_is_passed_through() {
        let runner = Ytdlp {
            path: "yt-dlp".to_string(),
            ffmpeg_location: Some("/opt/ffmpeg/bin/ffmpeg".to_string()),
        };
        let req = request(FormatChoice::BestOverall);
        let plan = FormatSelector::plan(&req.choice);
        let args = runner.fetch_args(&req, &plan);
        let at = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(args[at + 1], "/opt/ffmpeg/bin/ffmpeg");
    }

    #[test]
    fn format_dump_parses_and_drops_metadata_entries() {
        let json = br#"{
            "id": "abc",
            "formats": [
                {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "resolution": "1920x1080", "filesize": 123456}
            ]
        }"#;
        let formats = parse_formats(json).unwrap();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].format_id, "140");
        assert_eq!(formats[1].format_id, "137");
    }

    #[test]
    fn probe_of_a_playlist_collects_entries() {
        let json = br#"{
            "title": "My Mix",
            "entries": [
                {"id": "a1", "title": "First", "duration": 61.0, "upload_date": "20240101", "webpage_url": "https://example.com/a1"},
                null,
                {"id": "a2", "title": "Second", "url": "a2"}
            ]
        }"#;
        match parse_probe(json, "https://example.com/list").unwrap() {
            Probe::Playlist { title, entries } => {
                assert_eq!(title, "My Mix");
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].id, "a1");
                assert_eq!(entries[1].target_url(), Some("a2"));
            }
            other => panic!("expected a playlist, got {other:?}"),
        }
    }

    #[test]
    fn probe_of_a_single_video_falls_back_to_the_input_url() {
        let json = br#"{"id": "solo", "title": "One video", "duration": 30.5}"#;
        match parse_probe(json, "https://example.com/v/solo").unwrap() {
            Probe::Single(entry) => {
                assert_eq!(entry.id, "solo");
                assert_eq!(entry.target_url(), Some("https://example.com/v/solo"));
            }
            other => panic!("expected a single video, got {other:?}"),
        }
    }

    #[test]
    fn malformed_probe_output_is_a_parse_error() {
        assert!(matches!(
            parse_probe(b"not json", "https://example.com"),
            Err(DownloadError::Parse(_))
        ));
    }
}
