// Command-line surface. With a URL the program runs one non-interactive
// download; with no arguments it drops into the interactive session.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;

use crate::downloader::models::{DownloadRequest, FormatChoice, VideoEntry};
use crate::downloader::playlist::{self, PlaylistFilters, TitleMatch};
use crate::downloader::utils::{default_dest_dir, ensure_dir};
use crate::downloader::DownloadError;
use crate::interactive;
use crate::ytdlp::{Probe, Ytdlp};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Console downloader for video sites, powered by yt-dlp"
)]
pub struct Cli {
    /// Video or playlist URL. Omit it to start the interactive session.
    pub url: Option<String>,

    /// Destination folder for downloaded files
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Raw yt-dlp format selector, e.g. "best" or "137+140"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Extract the audio track and convert it to MP3
    #[arg(long)]
    pub mp3: bool,

    /// Print the formats available for the URL, then exit
    #[arg(short, long)]
    pub list_formats: bool,

    /// Download every entry of a playlist URL, not just the first video
    #[arg(long)]
    pub playlist: bool,

    /// Skip playlist entries shorter than this (seconds, mm:ss or hh:mm:ss)
    #[arg(long, value_parser = playlist::parse_duration)]
    pub min_duration: Option<u64>,

    /// Skip playlist entries longer than this
    #[arg(long, value_parser = playlist::parse_duration)]
    pub max_duration: Option<u64>,

    /// Skip entries uploaded before this date (YYYY-MM-DD, YYYYMMDD or DD/MM/YYYY)
    #[arg(long, value_parser = playlist::parse_date)]
    pub date_from: Option<String>,

    /// Skip entries uploaded after this date
    #[arg(long, value_parser = playlist::parse_date)]
    pub date_to: Option<String>,

    /// Only download entries whose title contains this text
    #[arg(long)]
    pub match_title: Option<String>,

    /// Interpret --match-title as a regular expression
    #[arg(long, requires = "match_title")]
    pub match_regex: bool,

    /// Path to the ffmpeg executable when it is not on PATH
    #[arg(long)]
    pub ffmpeg_location: Option<String>,

    /// Force the interactive session even when a URL is given
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let ytdlp =
            Ytdlp::locate(self.ffmpeg_location.as_deref()).map_err(download_failure)?;

        if self.interactive || self.url.is_none() {
            return interactive::run(&ytdlp).await;
        }

        let url = self.url.clone().unwrap();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("'{url}' is not an http(s) URL");
        }

        if self.list_formats {
            let formats = ytdlp.list_formats(&url).await.map_err(download_failure)?;
            if formats.is_empty() {
                println!("No downloadable formats were reported for this URL.");
            } else {
                print!("{}", interactive::format_table(&formats));
            }
            return Ok(());
        }

        let dest_dir = self.dest.clone().unwrap_or_else(default_dest_dir);
        ensure_dir(&dest_dir)
            .with_context(|| format!("cannot create {}", dest_dir.display()))?;

        let choice = self.resolve_choice();

        if self.playlist {
            self.run_playlist(&ytdlp, &url, &dest_dir, &choice).await
        } else {
            let request = DownloadRequest {
                url,
                dest_dir,
                choice,
            };
            ytdlp.fetch(&request).map_err(download_failure)?;
            println!("Done. Files saved under {}.", request.dest_dir.display());
            Ok(())
        }
    }

    fn resolve_choice(&self) -> FormatChoice {
        if self.mp3 {
            if self.format.is_some() {
                warn!("--format is ignored when --mp3 is set");
            }
            FormatChoice::BestAudioAsMp3
        } else if let Some(format) = &self.format {
            FormatChoice::Manual(format.clone())
        } else {
            FormatChoice::BestOverall
        }
    }

    fn filters(&self) -> anyhow::Result<PlaylistFilters> {
        let title = match &self.match_title {
            Some(pattern) => Some(TitleMatch::new(pattern, self.match_regex)?),
            None => None,
        };
        Ok(PlaylistFilters {
            min_duration: self.min_duration,
            max_duration: self.max_duration,
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            title,
        })
    }

    /// Sequential playlist flow: probe once, filter, download one entry
    /// at a time. A failed entry is reported and iteration goes on.
    async fn run_playlist(
        &self,
        ytdlp: &Ytdlp,
        url: &str,
        dest_dir: &Path,
        choice: &FormatChoice,
    ) -> anyhow::Result<()> {
        let filters = self.filters()?;

        let entries = match ytdlp.probe(url).await.map_err(download_failure)? {
            Probe::Playlist { title, entries } => {
                println!("Playlist \"{title}\": {} entries", entries.len());
                entries
            }
            Probe::Single(entry) => {
                println!("The URL resolved to a single video.");
                vec![entry]
            }
        };

        let total = entries.len();
        let mut downloaded = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            let label = if entry.title.is_empty() {
                entry.id.as_str()
            } else {
                entry.title.as_str()
            };

            if let Some(reason) = filters.skip_reason(entry) {
                println!("[{}/{total}] skipping {label}: {reason}", index + 1);
                skipped += 1;
                continue;
            }
            let Some(entry_url) = resolve_entry_url(entry) else {
                println!("[{}/{total}] skipping {label}: no usable URL", index + 1);
                skipped += 1;
                continue;
            };

            println!("[{}/{total}] {label}", index + 1);
            let request = DownloadRequest {
                url: entry_url,
                dest_dir: dest_dir.to_path_buf(),
                choice: choice.clone(),
            };
            match ytdlp.fetch(&request) {
                Ok(()) => downloaded += 1,
                Err(err) => {
                    failed += 1;
                    eprintln!("  failed: {err}");
                    if let Some(hint) = err.hint() {
                        eprintln!("  {hint}");
                    }
                }
            }
        }

        println!("{downloaded} downloaded, {skipped} skipped, {failed} failed");
        if failed > 0 {
            bail!("{failed} of {total} entries failed");
        }
        Ok(())
    }
}

/// Flat playlist entries sometimes carry only a bare video ID instead of
/// a URL; fall back to the canonical watch address in that case.
fn resolve_entry_url(entry: &VideoEntry) -> Option<String> {
    if let Some(url) = entry.target_url() {
        if url.starts_with("http") {
            return Some(url.to_string());
        }
    }
    if entry.id.is_empty() {
        None
    } else {
        Some(format!("https://www.youtube.com/watch?v={}", entry.id))
    }
}

fn download_failure(err: DownloadError) -> anyhow::Error {
    match err.hint() {
        Some(hint) => anyhow::anyhow!("{err}\n{hint}"),
        None => anyhow::Error::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vidgrab").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_arguments_means_interactive() {
        let cli = parse(&[]);
        assert!(cli.url.is_none());
        assert!(!cli.interactive);
    }

    #[test]
    fn duration_flags_parse_clock_layouts() {
        let cli = parse(&["--min-duration", "1:30", "--max-duration", "600", "https://x"]);
        assert_eq!(cli.min_duration, Some(90));
        assert_eq!(cli.max_duration, Some(600));
    }

    #[test]
    fn bad_duration_flag_is_rejected() {
        let result = Cli::try_parse_from(["vidgrab", "--min-duration", "1:2:3:4", "https://x"]);
        assert!(result.is_err());
    }

    #[test]
    fn date_flags_normalise_on_parse() {
        let cli = parse(&["--date-from", "2024-01-01", "--date-to", "31/12/2024", "https://x"]);
        assert_eq!(cli.date_from.as_deref(), Some("20240101"));
        assert_eq!(cli.date_to.as_deref(), Some("20241231"));
    }

    #[test]
    fn match_regex_requires_match_title() {
        let result = Cli::try_parse_from(["vidgrab", "--match-regex", "https://x"]);
        assert!(result.is_err());
    }

    #[test]
    fn mp3_flag_wins_over_format() {
        let cli = parse(&["--mp3", "--format", "22", "https://x"]);
        assert_eq!(cli.resolve_choice(), FormatChoice::BestAudioAsMp3);
    }

    #[test]
    fn format_flag_maps_to_manual() {
        let cli = parse(&["--format", "137+140", "https://x"]);
        assert_eq!(
            cli.resolve_choice(),
            FormatChoice::Manual("137+140".to_string())
        );
    }

    #[test]
    fn default_choice_is_best_overall() {
        let cli = parse(&["https://x"]);
        assert_eq!(cli.resolve_choice(), FormatChoice::BestOverall);
    }

    #[test]
    fn filters_carry_the_title_matcher() {
        let cli = parse(&["--match-title", "rust", "https://x"]);
        let filters = cli.filters().unwrap();
        assert!(matches!(filters.title, Some(TitleMatch::Substring(_))));
    }

    #[test]
    fn invalid_regex_fails_filter_construction() {
        let cli = parse(&["--match-title", "(unclosed", "--match-regex", "https://x"]);
        assert!(cli.filters().is_err());
    }

    #[test]
    fn bare_entry_ids_resolve_to_watch_urls() {
        let entry = VideoEntry {
            id: "abc123".into(),
            title: String::new(),
            duration: None,
            upload_date: None,
            webpage_url: None,
            url: Some("abc123".into()),
        };
        assert_eq!(
            resolve_entry_url(&entry).as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
    }

    #[test]
    fn full_urls_pass_through_unchanged() {
        let entry = VideoEntry {
            id: "abc123".into(),
            title: String::new(),
            duration: None,
            upload_date: None,
            webpage_url: Some("https://example.com/v/abc123".into()),
            url: None,
        };
        assert_eq!(
            resolve_entry_url(&entry).as_deref(),
            Some("https://example.com/v/abc123")
        );
    }

    #[test]
    fn entries_without_id_or_url_are_unresolvable() {
        let entry = VideoEntry {
            id: String::new(),
            title: "ghost".into(),
            duration: None,
            upload_date: None,
            webpage_url: None,
            url: None,
        };
        assert_eq!(resolve_entry_url(&entry), None);
    }
}
