// Subprocess and filesystem helpers shared by the probe and fetch paths

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;

/// Run a command to completion, capturing stdout/stderr, killing it when
/// the deadline passes. Pipes are drained from separate tasks so a chatty
/// child cannot deadlock on a full buffer.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DownloadError::Process {
            tool: program.to_string(),
            source: e,
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Tool(format!("could not capture stdout of {program}")))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Tool(format!("could not capture stderr of {program}")))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res.map_err(|e| DownloadError::Process {
                tool: program.to_string(),
                source: e,
            })?;
            let stdout = join_pipe(stdout_task, program).await?;
            let stderr = join_pipe(stderr_task, program).await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::NetworkTimeout(format!(
                "{program} did not finish within {timeout_secs}s"
            )))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    program: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::Tool(format!("pipe reader for {program} failed: {e}")))?
        .map_err(|e| DownloadError::Process {
            tool: program.to_string(),
            source: e,
        })
}

/// Create the directory (and parents) if it does not exist yet.
/// Returns whether anything had to be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}

/// Where downloads land when the user does not pick a folder.
pub fn default_dest_dir() -> PathBuf {
    dirs::download_dir()
        .map(|d| d.join("vidgrab"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

/// Human-readable size for the format listing.
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / 1_048_576.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else {
        format!("{:.2} MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_once_then_noops() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a").join("b");

        assert!(ensure_dir(&target).unwrap());
        assert!(target.is_dir());
        // second call is a no-op, not an error
        assert!(!ensure_dir(&target).unwrap());
    }

    #[test]
    fn ensure_dir_surfaces_creation_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        // a file sits where the directory should go
        assert!(ensure_dir(&file).is_err());
    }

    #[test]
    fn sizes_render_in_mb_and_gb() {
        assert_eq!(format_size(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[tokio::test]
    async fn timeout_kills_slow_commands() {
        let err = run_output_with_timeout("sleep", &["5".to_string()], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NetworkTimeout(_)));
    }

    #[tokio::test]
    async fn missing_program_is_a_process_error() {
        let err = run_output_with_timeout("/no/such/binary", &[], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Process { .. }));
    }
}
