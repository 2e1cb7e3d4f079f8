//! Shorts pipeline - download a YouTube video, cut it into short clips and publish them
//!
//! Every subcommand of the `shorts` binary is one disposable CI step. The library holds
//! the pieces those steps share: environment-driven configuration, the yt-dlp and ffmpeg
//! wrappers, the segmenter, S3-compatible storage and the Postgres video repository.

pub mod cli;
pub mod config;
pub mod db;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod segments;
pub mod storage;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::{RunConfig, Settings};
pub use extractors::{VideoInfo, VideoSource};
pub use publish::{PublishReport, Publisher};
pub use segments::{plan_segments, SegmentDescriptor};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Unrecoverable pipeline failures, each one ends the run with exit code 1
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Download failed for {video_id}: {reason}")]
    DownloadFailed { video_id: String, reason: String },

    #[error("No segments could be planned for {video_id} (duration {duration:.1}s)")]
    NoSegments { video_id: String, duration: f64 },

    #[error("No clips were created: all {attempted} segment(s) failed")]
    NoClipsCreated { attempted: usize },

    #[error("No clips found for {video_id} in {dir}")]
    NoClipsFound { video_id: String, dir: String },

    #[error("Nothing was published: {failed} of {attempted} artifact(s) failed")]
    NothingPublished { attempted: usize, failed: usize },

    #[error("Object not found in bucket {bucket}: {key}")]
    ObjectMissing { bucket: String, key: String },

    #[error("Upload to bucket {bucket} failed: {reason}")]
    UploadFailed { bucket: String, reason: String },
}
