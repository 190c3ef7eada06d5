pub mod cli;
pub mod downloader;
pub mod interactive;
pub mod ytdlp;

pub use downloader::errors::DownloadError;
pub use downloader::models::{DownloadRequest, FormatChoice};
