use anyhow::Result;
use std::collections::HashMap;

use super::Pipeline;
use crate::config::RunConfig;
use crate::output::{self, AnalysisDocument};
use crate::segments::plan_segments;
use crate::storage::{content_type_for, object_key, ObjectStore, S3Store};
use crate::PipelineError;

/// What `ingest` left in the processing bucket
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub video_id: String,
    pub title: String,
    pub duration: f64,
    pub segments: usize,
    pub files_archived: usize,
    pub archive_key: String,
    pub analysis_key: String,
}

impl Pipeline {
    /// Download a video, write its analysis document and archive, and upload both to the
    /// processing bucket
    pub async fn ingest(&self, config: &RunConfig) -> Result<IngestSummary> {
        let video_id = config.video_id.as_str();
        let downloads_dir = &self.settings.workspace.downloads_dir;

        let cookies = self.cookies_file();
        let source = self.download_source(video_id, cookies.as_deref()).await?;
        let transcript = self
            .transcript(video_id, cookies.as_deref())
            .await
            .unwrap_or_default();

        let segments = plan_segments(
            source.info.duration,
            &source.info.title,
            Some(transcript.as_slice()).filter(|t| !t.is_empty()),
        );
        if segments.is_empty() {
            tracing::warn!("No segments planned for {}", video_id);
        }

        let document = AnalysisDocument::new(&source, &transcript, &segments);
        let analysis_filename = output::analysis_filename(video_id);
        document.save(&downloads_dir.join(&analysis_filename))?;

        let archive_filename = output::archive_filename(video_id);
        let archive_path = downloads_dir.join(&archive_filename);
        let files_archived = output::build_archive(downloads_dir, video_id, &archive_path).await?;

        let store = S3Store::connect(&config.storage).await;
        let metadata = HashMap::from([("video_id".to_string(), video_id.to_string())]);

        let archive_key = object_key(video_id, &archive_filename);
        tracing::info!(
            "Uploading {} ({})",
            archive_key,
            crate::utils::format_file_size(crate::utils::file_size(&archive_path).await)
        );
        store
            .upload_file(
                &archive_key,
                &archive_path,
                content_type_for(&archive_filename),
                metadata.clone(),
            )
            .await
            .map_err(|e| upload_failed(config, e))?;

        let analysis_key = object_key(video_id, &analysis_filename);
        tracing::info!("Uploading {}", analysis_key);
        store
            .upload_bytes(
                &analysis_key,
                document.to_json()?.into_bytes(),
                content_type_for(&analysis_filename),
                metadata,
            )
            .await
            .map_err(|e| upload_failed(config, e))?;

        Ok(IngestSummary {
            video_id: video_id.to_string(),
            title: source.info.title,
            duration: source.info.duration,
            segments: segments.len(),
            files_archived,
            archive_key,
            analysis_key,
        })
    }
}

fn upload_failed(config: &RunConfig, error: crate::storage::StorageError) -> PipelineError {
    super::log_hints(error.hints());
    PipelineError::UploadFailed {
        bucket: config.storage.bucket.clone(),
        reason: error.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::super::test_support::{failing_tool_settings, run_config};
    use super::*;

    #[tokio::test]
    async fn test_failed_download_ends_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let err = pipeline.ingest(&run_config()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DownloadFailed { video_id, .. }) if video_id == "abc123"
        ));
        assert!(!dir.path().join("downloads").join("abc123.zip").exists());
    }
}
