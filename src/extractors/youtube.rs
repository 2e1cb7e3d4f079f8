use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{VideoInfo, VideoSource};
use crate::config::ToolSettings;
use crate::utils::{self, run_tool};

/// Upper bound for one yt-dlp download
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Upper bound for one ffprobe call
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefer separate mp4 video + m4a audio merged into one file, then any single mp4, then anything
pub const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// YouTube video downloader using yt-dlp
pub struct YoutubeDownloader {
    yt_dlp_path: String,
    ffprobe_path: String,
    show_progress: bool,
}

impl YoutubeDownloader {
    pub fn new(tools: &ToolSettings, show_progress: bool) -> Self {
        Self {
            yt_dlp_path: tools.yt_dlp.clone(),
            ffprobe_path: tools.ffprobe.clone(),
            show_progress,
        }
    }

    /// Watch page URL for a video identifier
    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }

    /// Path the merged video ends up at
    pub fn video_path(output_dir: &Path, video_id: &str) -> PathBuf {
        output_dir.join(format!("{}.mp4", video_id))
    }

    /// yt-dlp arguments for downloading a video with its metadata, description and thumbnail
    pub fn download_args(
        video_id: &str,
        output_dir: &Path,
        cookies_file: Option<&Path>,
    ) -> Vec<String> {
        let output_template = output_dir.join(format!("{}.%(ext)s", video_id));

        let mut args = vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
            "--write-info-json".to_string(),
            "--write-description".to_string(),
            "--write-thumbnail".to_string(),
            "--no-playlist".to_string(),
        ];

        if let Some(cookies) = cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args.push(Self::watch_url(video_id));
        args
    }

    /// Download a video into `output_dir` and read its metadata.
    ///
    /// Fails on a non-zero yt-dlp exit, on timeout, or when no mp4 was produced.
    pub async fn download(
        &self,
        video_id: &str,
        output_dir: &Path,
        cookies_file: Option<&Path>,
    ) -> Result<VideoSource> {
        fs_err::create_dir_all(output_dir).context("Failed to create download directory")?;

        match cookies_file {
            Some(cookies) => tracing::info!("Using cookies file: {}", cookies.display()),
            None => tracing::warn!("No cookies file, YouTube may block the download as a bot"),
        }

        tracing::info!("Downloading video from YouTube: {}", video_id);

        let progress = utils::spinner("Downloading video with yt-dlp...", self.show_progress);

        let mut command = Command::new(&self.yt_dlp_path);
        command.args(Self::download_args(video_id, output_dir, cookies_file));
        let result = run_tool(&mut command, DOWNLOAD_TIMEOUT).await;

        match &result {
            Ok(_) => progress.finish_with_message("Download complete"),
            Err(_) => progress.abandon_with_message("Download failed"),
        }
        result.context("yt-dlp failed")?;

        let path = Self::video_path(output_dir, video_id);
        if !path.is_file() {
            anyhow::bail!("Video file not found after download: {}", path.display());
        }

        tracing::info!(
            "Downloaded {} ({})",
            path.display(),
            utils::format_file_size(utils::file_size(&path).await)
        );

        let mut info = VideoInfo::from_sidecar(output_dir, video_id);
        if info.duration <= 0.0 {
            info.duration = self.probe_duration(&path).await;
        }

        Ok(VideoSource {
            video_id: video_id.to_string(),
            path,
            info,
        })
    }

    /// Duration of a media file according to ffprobe, 0 when it cannot be determined
    pub async fn probe_duration(&self, path: &Path) -> f64 {
        let mut command = Command::new(&self.ffprobe_path);
        command.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);
        command.arg(path);

        let output = match run_tool(&mut command, PROBE_TIMEOUT).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Could not probe duration: {}", e);
                return 0.0;
            }
        };

        match parse_probe_duration(&String::from_utf8_lossy(&output.stdout)) {
            Some(duration) => duration,
            None => {
                tracing::warn!("ffprobe returned no usable duration");
                0.0
            }
        }
    }
}

/// Parse ffprobe's bare `format=duration` output
fn parse_probe_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
