use anyhow::Result;

use super::{connect_database, Pipeline};
use crate::config::RunConfig;
use crate::extractors::VideoInfo;
use crate::publish::{PublishReport, Publisher};
use crate::segments::ClipArtifact;
use crate::storage::S3Store;
use crate::PipelineError;

impl Pipeline {
    /// Publish clips already present in the shorts directory
    pub async fn publish(&self, config: &RunConfig) -> Result<PublishReport> {
        let video_id = config.video_id.as_str();
        let shorts_dir = &self.settings.workspace.shorts_dir;

        let clips = if shorts_dir.is_dir() {
            ClipArtifact::discover(shorts_dir, video_id)?
        } else {
            Vec::new()
        };
        if clips.is_empty() {
            return Err(PipelineError::NoClipsFound {
                video_id: video_id.to_string(),
                dir: shorts_dir.display().to_string(),
            }
            .into());
        }
        tracing::info!("Found {} clip(s) for {}", clips.len(), video_id);

        let downloads_dir = &self.settings.workspace.downloads_dir;
        let source = VideoInfo::sidecar_path(downloads_dir, video_id)
            .is_file()
            .then(|| VideoInfo::from_sidecar(downloads_dir, video_id));

        let store = S3Store::connect(&config.storage).await;
        let repo = connect_database(config.database.as_ref()).await?;

        let mut publisher = Publisher::new(&store, &repo, &config.storage, video_id);
        if let Some(info) = source.as_ref() {
            publisher = publisher.with_source(info);
        }
        let report = publisher.publish_clips(&clips).await;
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
    async fn test_no_clips_found() {
        let dir = tempfile::tempdir().unwrap();
        let settings = failing_tool_settings(dir.path());
        fs_err::create_dir_all(&settings.workspace.shorts_dir).unwrap();
        fs_err::write(settings.workspace.shorts_dir.join("other_Talk_1.mp4"), b"").unwrap();

        let pipeline = Pipeline::new(settings, false);
        let err = pipeline.publish(&run_config()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoClipsFound { video_id, .. }) if video_id == "abc123"
        ));
    }

    #[tokio::test]
    async fn test_missing_shorts_dir_means_no_clips() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let err = pipeline.publish(&run_config()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoClipsFound { .. })
        ));
    }
}
