//! The CI steps, one method of [`Pipeline`] per subcommand

use std::path::{Path, PathBuf};
use tracing::Span;
use uuid::Uuid;

use crate::config::{DatabaseConfig, Settings};
use crate::db::PgVideoRepository;
use crate::extractors::{TranscriptEntry, TranscriptRetriever, VideoSource, YoutubeDownloader};
use crate::PipelineError;

mod fetch;
mod ingest;
mod process;
mod publish;

pub use fetch::FetchSummary;
pub use ingest::IngestSummary;

/// Shared state of one run: non-secret settings and whether to draw spinners
pub struct Pipeline {
    settings: Settings,
    show_progress: bool,
}

/// Span wrapping one run, carrying a fresh run id
pub fn run_span(command: &str, video_id: &str) -> Span {
    let run_id = Uuid::new_v4();
    tracing::info_span!("run", command, video_id, %run_id)
}

/// Log troubleshooting hints under an error
pub(crate) fn log_hints(hints: &[&str]) {
    if hints.is_empty() {
        return;
    }
    tracing::error!("Troubleshooting:");
    for hint in hints {
        tracing::error!("  - {}", hint);
    }
}

impl Pipeline {
    pub fn new(settings: Settings, show_progress: bool) -> Self {
        Self {
            settings,
            show_progress,
        }
    }

    fn cookies_file(&self) -> Option<PathBuf> {
        let cookies = self.settings.find_cookies_file();
        if cookies.is_none() {
            let searched: Vec<String> = self
                .settings
                .youtube
                .cookies_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            tracing::warn!("No cookies file found (searched: {})", searched.join(", "));
        }
        cookies
    }

    /// Download the source video; any failure ends the run
    async fn download_source(
        &self,
        video_id: &str,
        cookies: Option<&Path>,
    ) -> anyhow::Result<VideoSource> {
        let downloader = YoutubeDownloader::new(&self.settings.tools, self.show_progress);
        let source = downloader
            .download(video_id, &self.settings.workspace.downloads_dir, cookies)
            .await
            .map_err(|e| PipelineError::DownloadFailed {
                video_id: video_id.to_string(),
                reason: format!("{:#}", e),
            })?;

        tracing::info!(
            "Video: {} ({})",
            source.info.title,
            crate::utils::format_duration(source.info.duration)
        );
        Ok(source)
    }

    /// Best-effort transcript; an unavailable transcript is logged and yields `None`
    async fn transcript(&self, video_id: &str, cookies: Option<&Path>) -> Option<Vec<TranscriptEntry>> {
        let work_dir = self.settings.workspace.temp_dir.join(video_id);
        if let Err(e) = fs_err::create_dir_all(&work_dir) {
            tracing::warn!("Transcript skipped: {}", e);
            return None;
        }

        let retriever = TranscriptRetriever::new(
            &self.settings.tools.yt_dlp,
            &self.settings.youtube.transcript_languages,
            cookies,
        );

        match retriever.fetch(video_id, &work_dir).await {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!("Transcript unavailable, using synthetic descriptions: {}", e);
                None
            }
        }
    }
}

/// Connect to the video database, printing hints when the connection fails
async fn connect_database(config: Option<&DatabaseConfig>) -> anyhow::Result<PgVideoRepository> {
    let config = config.ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for this step"))?;

    match PgVideoRepository::connect(config).await {
        Ok(repo) => Ok(repo),
        Err(e) => {
            tracing::error!("{}", e);
            log_hints(e.hints());
            Err(e.into())
        }
    }
}
