//! Best-effort caption retrieval.
//!
//! Captions are fetched through yt-dlp's subtitle mode in the `json3` format: manually
//! authored tracks first, auto-generated ones second, each in the configured language
//! order. A missing transcript is never fatal; callers get [`TranscriptUnavailable`] and
//! fall back to synthetic segment descriptions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::youtube::YoutubeDownloader;
use crate::utils::{run_tool, ToolError};

/// Upper bound for one subtitle download
const SUBTITLE_TIMEOUT: Duration = Duration::from_secs(120);

/// One caption line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,

    /// Offset from the start of the video, in seconds
    pub start: f64,

    /// How long the line is shown, in seconds
    pub duration: f64,
}

/// Why no transcript could be produced
#[derive(thiserror::Error, Debug)]
pub enum TranscriptUnavailable {
    #[error("no captions in languages [{languages}]")]
    NoCaptions { languages: String },

    #[error("subtitle download failed: {0}")]
    Tool(#[from] ToolError),

    #[error("could not read subtitles from {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Caption track kinds, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackKind {
    Manual,
    Generated,
}

impl TrackKind {
    fn flag(&self) -> &'static str {
        match self {
            TrackKind::Manual => "--write-subs",
            TrackKind::Generated => "--write-auto-subs",
        }
    }
}

/// yt-dlp `json3` subtitle document
#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<u64>,
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Fetches captions for a video through yt-dlp
pub struct TranscriptRetriever {
    yt_dlp_path: String,
    languages: Vec<String>,
    cookies_file: Option<PathBuf>,
}

impl TranscriptRetriever {
    pub fn new(yt_dlp_path: &str, languages: &[String], cookies_file: Option<&Path>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.to_string(),
            languages: languages.to_vec(),
            cookies_file: cookies_file.map(Path::to_path_buf),
        }
    }

    /// Fetch the transcript of `video_id`, writing subtitle files into `work_dir`
    pub async fn fetch(
        &self,
        video_id: &str,
        work_dir: &Path,
    ) -> Result<Vec<TranscriptEntry>, TranscriptUnavailable> {
        tracing::info!("Fetching transcript for: {}", video_id);

        for kind in [TrackKind::Manual, TrackKind::Generated] {
            clear_subtitle_files(work_dir, video_id);

            let mut command = Command::new(&self.yt_dlp_path);
            command.args(self.subtitle_args(video_id, work_dir, kind));
            run_tool(&mut command, SUBTITLE_TIMEOUT).await?;

            let Some(path) = find_subtitle_file(work_dir, video_id, &self.languages) else {
                tracing::debug!("No {:?} captions found", kind);
                continue;
            };

            let content = fs_err::read_to_string(&path).map_err(|e| {
                TranscriptUnavailable::Unreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            let entries = parse_json3(&content).map_err(|e| TranscriptUnavailable::Unreadable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

            if !entries.is_empty() {
                tracing::info!(
                    "Fetched {} transcript entries ({:?} captions, {})",
                    entries.len(),
                    kind,
                    path.display()
                );
                return Ok(entries);
            }
        }

        Err(TranscriptUnavailable::NoCaptions {
            languages: self.languages.join(", "),
        })
    }

    fn subtitle_args(&self, video_id: &str, work_dir: &Path, kind: TrackKind) -> Vec<String> {
        let output_template = work_dir.join(format!("{}.%(ext)s", video_id));

        let mut args = vec![
            "--skip-download".to_string(),
            kind.flag().to_string(),
            "--sub-langs".to_string(),
            self.languages.join(","),
            "--sub-format".to_string(),
            "json3".to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
        ];

        if let Some(cookies) = &self.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args.push(YoutubeDownloader::watch_url(video_id));
        args
    }
}

/// Remove `{id}.*.json3` files left by an earlier pass or run
fn clear_subtitle_files(dir: &Path, video_id: &str) {
    let prefix = format!("{}.", video_id);
    let Ok(entries) = fs_err::read_dir(dir) else {
        return;
    };

    for path in entries.filter_map(|entry| entry.ok()).map(|entry| entry.path()) {
        let stale = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(&prefix) && name.ends_with(".json3"))
            .unwrap_or(false);
        if stale {
            if let Err(e) = fs_err::remove_file(&path) {
                tracing::warn!("Failed to remove old subtitles: {}", e);
            }
        }
    }
}

/// First subtitle file present for the preferred languages.
///
/// yt-dlp names them `{id}.{lang}.json3`; auto-generated tracks may carry a suffix such
/// as `en-orig`, which is accepted after an exact match.
fn find_subtitle_file(dir: &Path, video_id: &str, languages: &[String]) -> Option<PathBuf> {
    for lang in languages {
        let exact = dir.join(format!("{}.{}.json3", video_id, lang));
        if exact.is_file() {
            return Some(exact);
        }

        let prefix = format!("{}.{}-", video_id, lang);
        let variant = fs_err::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(&prefix) && name.ends_with(".json3"))
                    .unwrap_or(false)
            })
            .min();

        if variant.is_some() {
            return variant;
        }
    }

    None
}

/// Parse a `json3` subtitle document into transcript entries, skipping empty events
fn parse_json3(content: &str) -> Result<Vec<TranscriptEntry>, serde_json::Error> {
    let document: Json3 = serde_json::from_str(content)?;

    let entries = document
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }

            Some(TranscriptEntry {
                text,
                start: event.t_start_ms.unwrap_or(0) as f64 / 1000.0,
                duration: event.d_duration_ms.unwrap_or(0) as f64 / 1000.0,
            })
        })
        .collect();

    Ok(entries)
}
