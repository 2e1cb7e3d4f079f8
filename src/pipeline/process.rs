use anyhow::Result;

use super::{connect_database, Pipeline};
use crate::config::RunConfig;
use crate::publish::{PublishReport, Publisher};
use crate::segments::{plan_segments, ClipExtractor};
use crate::storage::S3Store;
use crate::PipelineError;

impl Pipeline {
    /// Full run: download, transcript, segment, cut clips and publish them
    pub async fn process(&self, config: &RunConfig) -> Result<PublishReport> {
        let video_id = config.video_id.as_str();
        let workspace = &self.settings.workspace;
        for dir in [&workspace.downloads_dir, &workspace.shorts_dir, &workspace.temp_dir] {
            fs_err::create_dir_all(dir)?;
        }

        let cookies = self.cookies_file();
        let source = self.download_source(video_id, cookies.as_deref()).await?;
        let transcript = self.transcript(video_id, cookies.as_deref()).await;

        let segments = plan_segments(
            source.info.duration,
            &source.info.title,
            transcript.as_deref(),
        );
        if segments.is_empty() {
            return Err(PipelineError::NoSegments {
                video_id: video_id.to_string(),
                duration: source.info.duration,
            }
            .into());
        }
        tracing::info!("Planned {} segment(s)", segments.len());

        let extractor = ClipExtractor::new(&self.settings.tools, self.show_progress);
        let clips = extractor
            .extract_all(&source, &segments, &workspace.shorts_dir)
            .await?;
        if clips.is_empty() {
            return Err(PipelineError::NoClipsCreated {
                attempted: segments.len(),
            }
            .into());
        }

        let store = S3Store::connect(&config.storage).await;
        let repo = connect_database(config.database.as_ref()).await?;

        let report = Publisher::new(&store, &repo, &config.storage, video_id)
            .with_source(&source.info)
            .publish_clips(&clips)
            .await;
        repo.close().await;

        if !report.is_success() {
            return Err(PipelineError::NothingPublished {
                attempted: report.attempted,
                failed: report.failed,
            }
            .into());
        }
        Ok(report)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::super::test_support::{failing_tool_settings, run_config};
    use super::*;

    #[tokio::test]
    async fn test_failed_download_ends_process() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let err = pipeline.process(&run_config()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DownloadFailed { .. })
        ));
        assert!(dir.path().join("shorts").is_dir());
    }
}
