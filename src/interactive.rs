// Interactive session: prompt for a URL, a destination and a quality
// choice, download, ask whether to go again. Input mistakes re-prompt;
// EOF on stdin ends the session cleanly.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, FormatChoice, FormatDescriptor};
use crate::downloader::tools;
use crate::downloader::utils::{default_dest_dir, ensure_dir, format_size};
use crate::ytdlp::Ytdlp;

const MENU: &str = "\
Quality options:
  1. Best overall (video+audio, merged when streams are separate)
  2. Best quality in MP4
  3. Best audio only (original container)
  4. Best audio only, converted to MP3
  5. List every available format and pick one manually
  0. Default (same as 1)";

pub async fn run(ytdlp: &Ytdlp) -> anyhow::Result<()> {
    banner(ytdlp);
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    run_session(ytdlp, &mut input).await
}

async fn run_session(ytdlp: &Ytdlp, input: &mut impl BufRead) -> anyhow::Result<()> {
    loop {
        let Some(url) = ask_url(input) else { break };
        let Some(dest_dir) = ask_dest(input, &default_dest_dir()) else {
            break;
        };
        let Some(menu_choice) = ask_choice(input) else { break };

        let choice = match menu_choice {
            FormatChoice::ListFormats => {
                println!("\nFetching available formats, this can take a moment...");
                match ytdlp.list_formats(&url).await {
                    Ok(formats) => {
                        let Some(resolved) = choose_from_listing(input, &formats) else {
                            break;
                        };
                        resolved
                    }
                    Err(err) => {
                        report_failure(&err);
                        if ask_continue(input) {
                            continue;
                        }
                        break;
                    }
                }
            }
            other => other,
        };

        let request = DownloadRequest {
            url,
            dest_dir,
            choice,
        };
        println!("\nDownloading {}", request.url);
        match ytdlp.fetch(&request) {
            Ok(()) => println!("Done. Files saved under {}.", request.dest_dir.display()),
            Err(err) => report_failure(&err),
        }

        if !ask_continue(input) {
            break;
        }
        println!();
    }

    println!("Goodbye!");
    Ok(())
}

fn banner(ytdlp: &Ytdlp) {
    println!(
        "vidgrab {} - interactive downloader powered by yt-dlp",
        env!("CARGO_PKG_VERSION")
    );
    match tools::version_of(ytdlp.path()) {
        Some(version) => println!("yt-dlp {version} at {}", ytdlp.path()),
        None => println!("yt-dlp at {}", ytdlp.path()),
    }
    match ytdlp.ffmpeg_location() {
        Some(path) => match tools::version_of(path) {
            Some(version) => println!("ffmpeg at {path} ({version})"),
            None => println!("ffmpeg at {path}"),
        },
        None => println!(
            "ffmpeg was not found. Merging and MP3 conversion will fail until it is installed."
        ),
    }
    println!();
}

/// Print a prompt and read one trimmed line. `None` means stdin closed.
fn prompt(input: &mut impl BufRead, question: &str) -> Option<String> {
    print!("{question}");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn ask_url(input: &mut impl BufRead) -> Option<String> {
    loop {
        let answer = prompt(input, "Video URL: ")?;
        if answer.is_empty() {
            println!("The URL cannot be empty.");
            continue;
        }
        if answer.starts_with("http://") || answer.starts_with("https://") {
            return Some(answer);
        }
        println!("Enter a full URL, starting with http:// or https://.");
    }
}

fn ask_dest(input: &mut impl BufRead, default: &Path) -> Option<PathBuf> {
    loop {
        let answer = prompt(
            input,
            &format!("Destination folder [{}]: ", default.display()),
        )?;
        let dir = if answer.is_empty() {
            default.to_path_buf()
        } else {
            PathBuf::from(answer)
        };
        match ensure_dir(&dir) {
            Ok(created) => {
                if created {
                    println!("Created {}.", dir.display());
                }
                return Some(dir);
            }
            Err(err) => println!("Cannot use {}: {err}. Try another path.", dir.display()),
        }
    }
}

fn ask_choice(input: &mut impl BufRead) -> Option<FormatChoice> {
    println!("\n{MENU}");
    loop {
        let answer = prompt(input, "Option (0-5) [0]: ")?;
        match FormatChoice::parse_menu(&answer) {
            Some(choice) => return Some(choice),
            None => println!("Pick a number between 0 and 5."),
        }
    }
}

/// The listing round-trip: show the table, then ask for a format ID.
/// 'c' cancels back to the default quality; so does an empty listing.
fn choose_from_listing(
    input: &mut impl BufRead,
    formats: &[FormatDescriptor],
) -> Option<FormatChoice> {
    if formats.is_empty() {
        println!("No downloadable formats were reported; using the best overall quality.");
        return Some(FormatChoice::BestOverall);
    }

    print!("{}", format_table(formats));
    loop {
        let answer = prompt(
            input,
            "Format ID ('137+140' fetches separate video and audio, 'c' cancels): ",
        )?;
        if answer.eq_ignore_ascii_case("c") {
            println!("Using the best overall quality instead.");
            return Some(FormatChoice::BestOverall);
        }
        if answer.is_empty() {
            println!("Type one of the format IDs listed above.");
            continue;
        }
        return Some(FormatChoice::Manual(answer));
    }
}

fn ask_continue(input: &mut impl BufRead) -> bool {
    match prompt(input, "\nDownload another video? (y/N): ") {
        Some(answer) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
        None => false,
    }
}

fn report_failure(err: &DownloadError) {
    println!("Download failed: {err}");
    if let Some(hint) = err.hint() {
        println!("{hint}");
    }
}

pub fn format_table(formats: &[FormatDescriptor]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} | {:<11} | {:<5} | {:<12} | {:<11} | Note",
        "ID", "Type", "Ext", "Resolution", "Size"
    );
    for format in formats {
        let kind = format.kind().map(|k| k.label()).unwrap_or("-");
        let resolution = format.resolution.as_deref().unwrap_or("audio");
        let size = format
            .effective_size()
            .map(format_size)
            .unwrap_or_else(|| "unknown".to_string());
        let note = format.format_note.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "{:<10} | {:<11} | {:<5} | {:<12} | {:<11} | {}",
            format.format_id, kind, format.ext, resolution, size, note
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn blank_and_malformed_urls_reprompt() {
        let mut input = Cursor::new("\n   \nftp://nope\nhttps://example.com/v\n");
        assert_eq!(
            ask_url(&mut input).as_deref(),
            Some("https://example.com/v")
        );
    }

    #[test]
    fn url_prompt_ends_on_eof() {
        let mut input = Cursor::new("");
        assert_eq!(ask_url(&mut input), None);
    }

    #[test]
    fn blank_destination_takes_the_default() {
        let tmp = tempfile::tempdir().unwrap();
        let default = tmp.path().join("downloads");
        let mut input = Cursor::new("\n");
        let picked = ask_dest(&mut input, &default).unwrap();
        assert_eq!(picked, default);
        assert!(default.is_dir());
    }

    #[test]
    fn unusable_destination_reprompts() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let good = tmp.path().join("ok");

        let script = format!("{}\n{}\n", blocker.display(), good.display());
        let mut input = Cursor::new(script);
        let picked = ask_dest(&mut input, tmp.path()).unwrap();
        assert_eq!(picked, good);
        assert!(good.is_dir());
    }

    #[test]
    fn menu_reprompts_until_valid() {
        let mut input = Cursor::new("9\nabc\n4\n");
        assert_eq!(ask_choice(&mut input), Some(FormatChoice::BestAudioAsMp3));
    }

    #[test]
    fn listing_cancel_falls_back_to_default() {
        let formats = vec![descriptor("22")];
        let mut input = Cursor::new("c\n");
        assert_eq!(
            choose_from_listing(&mut input, &formats),
            Some(FormatChoice::BestOverall)
        );
    }

    #[test]
    fn listing_returns_the_typed_id_verbatim() {
        let formats = vec![descriptor("137")];
        let mut input = Cursor::new("\n137+140\n");
        assert_eq!(
            choose_from_listing(&mut input, &formats),
            Some(FormatChoice::Manual("137+140".to_string()))
        );
    }

    #[test]
    fn empty_listing_needs_no_input() {
        let mut input = Cursor::new("");
        assert_eq!(
            choose_from_listing(&mut input, &[]),
            Some(FormatChoice::BestOverall)
        );
    }

    #[test]
    fn continue_prompt_defaults_to_no() {
        let mut answers = Cursor::new("y\nyes\nn\n\n");
        assert!(ask_continue(&mut answers));
        assert!(ask_continue(&mut answers));
        assert!(!ask_continue(&mut answers));
        assert!(!ask_continue(&mut answers));
        // EOF also means stop
        assert!(!ask_continue(&mut answers));
    }

    #[test]
    fn table_lists_each_format_row() {
        let table = format_table(&[descriptor("137"), descriptor("140")]);
        assert!(table.contains("137"));
        assert!(table.contains("140"));
        assert!(table.lines().count() >= 3);
    }

    fn descriptor(id: &str) -> FormatDescriptor {
        FormatDescriptor {
            format_id: id.to_string(),
            ext: "mp4".to_string(),
            resolution: Some("1920x1080".to_string()),
            vcodec: Some("avc1".to_string()),
            acodec: Some("mp4a".to_string()),
            filesize: Some(1_048_576),
            filesize_approx: None,
            abr: None,
            format_note: Some("1080p".to_string()),
        }
    }
}
