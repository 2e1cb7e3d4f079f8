use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::SegmentDescriptor;
use crate::config::ToolSettings;
use crate::extractors::VideoSource;
use crate::utils::{self, format_timestamp, run_tool, sanitize_filename};

/// Upper bound for cutting one clip
pub const CLIP_TIMEOUT: Duration = Duration::from_secs(300);

const VIDEO_CODEC: &str = "libx264";
const AUDIO_CODEC: &str = "aac";
const PRESET: &str = "fast";
const CRF: &str = "23";

/// A clip written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct ClipArtifact {
    /// Identifier of the clip itself: its filename without extension
    pub identifier: String,

    pub filename: String,

    pub path: PathBuf,

    /// The segment the clip was cut from, unknown for clips found on disk
    pub segment: Option<SegmentDescriptor>,
}

impl ClipArtifact {
    /// Describe an existing `.mp4` clip file
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        let identifier = filename.strip_suffix(".mp4")?.to_string();
        if identifier.is_empty() {
            return None;
        }

        Some(Self {
            identifier,
            filename,
            path: path.to_path_buf(),
            segment: None,
        })
    }

    /// Clips in `dir` belonging to `video_id`, sorted by filename
    pub fn discover(dir: &Path, video_id: &str) -> Result<Vec<Self>> {
        let prefix = format!("{}_", video_id);
        let mut clips: Vec<Self> = fs_err::read_dir(dir)
            .context("Failed to read shorts directory")?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| Self::from_path(&path))
            .filter(|clip| clip.filename.starts_with(&prefix))
            .collect();

        clips.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(clips)
    }
}

/// Cuts segments out of a source video with ffmpeg
pub struct ClipExtractor {
    ffmpeg_path: String,
    show_progress: bool,
}

impl ClipExtractor {
    pub fn new(tools: &ToolSettings, show_progress: bool) -> Self {
        Self {
            ffmpeg_path: tools.ffmpeg.clone(),
            show_progress,
        }
    }

    /// `{video_id}_{sanitized title}_{index}.mp4`, unique within a run through the index
    pub fn clip_filename(video_id: &str, title: &str, index: usize) -> String {
        format!("{}_{}_{}.mp4", video_id, sanitize_filename(title), index)
    }

    /// ffmpeg arguments: seek before opening the input, read exactly the segment length,
    /// re-encode both streams
    pub fn ffmpeg_args(input: &Path, output: &Path, segment: &SegmentDescriptor) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format_timestamp(segment.start),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-t".to_string(),
            format_timestamp(segment.duration()),
            "-c:v".to_string(),
            VIDEO_CODEC.to_string(),
            "-c:a".to_string(),
            AUDIO_CODEC.to_string(),
            "-preset".to_string(),
            PRESET.to_string(),
            "-crf".to_string(),
            CRF.to_string(),
            "-y".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Cut one segment into `output_dir`
    pub async fn extract(
        &self,
        source: &VideoSource,
        segment: &SegmentDescriptor,
        index: usize,
        output_dir: &Path,
    ) -> Result<ClipArtifact> {
        let filename = Self::clip_filename(&source.video_id, &segment.title, index);
        let path = output_dir.join(&filename);

        let progress = utils::spinner(format!("Cutting {}...", filename), self.show_progress);

        let mut command = Command::new(&self.ffmpeg_path);
        command.args(Self::ffmpeg_args(&source.path, &path, segment));
        let result = run_tool(&mut command, CLIP_TIMEOUT).await;
        progress.finish_and_clear();
        if let Err(e) = result {
            discard_partial(&path).await;
            return Err(anyhow::Error::new(e).context("ffmpeg failed"));
        }

        if !path.is_file() {
            anyhow::bail!("ffmpeg produced no output file: {}", path.display());
        }

        tracing::info!(
            "Created {} ({})",
            filename,
            utils::format_file_size(utils::file_size(&path).await)
        );

        let identifier = filename.trim_end_matches(".mp4").to_string();
        Ok(ClipArtifact {
            identifier,
            filename,
            path,
            segment: Some(segment.clone()),
        })
    }

    /// Cut every segment, one after another; a failed segment is logged and skipped
    pub async fn extract_all(
        &self,
        source: &VideoSource,
        segments: &[SegmentDescriptor],
        output_dir: &Path,
    ) -> Result<Vec<ClipArtifact>> {
        fs_err::create_dir_all(output_dir).context("Failed to create shorts directory")?;

        let mut clips = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let index = i + 1;
            tracing::info!(
                "Segment {}/{}: {} ({:.0}s - {:.0}s)",
                index,
                segments.len(),
                segment.title,
                segment.start,
                segment.end
            );

            match self.extract(source, segment, index, output_dir).await {
                Ok(clip) => clips.push(clip),
                Err(e) => tracing::error!("Segment {} failed: {:#}", index, e),
            }
        }

        tracing::info!("Created {}/{} clips", clips.len(), segments.len());
        Ok(clips)
    }
}

/// Remove whatever a failed or killed ffmpeg left at `path`
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial clip {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial clip {}: {}", path.display(), e),
    }
}
