use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod transcript;
pub mod youtube;

pub use transcript::{TranscriptEntry, TranscriptRetriever, TranscriptUnavailable};
pub use youtube::YoutubeDownloader;

/// Metadata of a downloaded video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Video title, the identifier when the platform gave none
    pub title: String,

    /// Video description
    pub description: String,

    /// Duration in seconds, 0 when unknown
    pub duration: f64,
}

/// A downloaded source video
#[derive(Debug, Clone)]
pub struct VideoSource {
    /// Platform identifier of the video
    pub video_id: String,

    /// Local media file
    pub path: PathBuf,

    /// Title, description and duration
    pub info: VideoInfo,
}

/// Subset of yt-dlp's `.info.json` sidecar we read
#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
}

impl VideoInfo {
    /// Placeholder info used when no sidecar can be read
    pub fn fallback(video_id: &str) -> Self {
        Self {
            title: video_id.to_string(),
            description: String::new(),
            duration: 0.0,
        }
    }

    /// Path of the metadata sidecar yt-dlp writes next to the video
    pub fn sidecar_path(dir: &Path, video_id: &str) -> PathBuf {
        dir.join(format!("{}.info.json", video_id))
    }

    /// Read title, description and duration from the `.info.json` sidecar.
    ///
    /// Missing fields fall back to the identifier, an empty description and a zero duration.
    pub fn from_sidecar(dir: &Path, video_id: &str) -> Self {
        let path = Self::sidecar_path(dir, video_id);
        let content = match fs_err::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("No video metadata sidecar: {}", e);
                return Self::fallback(video_id);
            }
        };

        match serde_json::from_str::<InfoJson>(&content) {
            Ok(info) => Self {
                title: info
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| video_id.to_string()),
                description: info.description.unwrap_or_default(),
                duration: info
                    .duration
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .unwrap_or(0.0),
            },
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                Self::fallback(video_id)
            }
        }
    }
}
