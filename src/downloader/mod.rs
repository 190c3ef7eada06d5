// Downloader module - shared types and helpers around the yt-dlp invocation

pub mod errors;
pub mod format_selector;
pub mod models;
pub mod playlist;
pub mod progress;
pub mod tools;
pub mod utils;

pub use errors::DownloadError;
pub use format_selector::{FormatPlan, FormatSelector, PostProcess};
pub use models::{DownloadProgress, DownloadRequest, FormatChoice, FormatDescriptor, VideoEntry};
pub use playlist::PlaylistFilters;
