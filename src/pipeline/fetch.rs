use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{log_hints, Pipeline};
use crate::config::RunConfig;
use crate::output::{self, AnalysisDocument};
use crate::storage::{object_key, ObjectStore, S3Store, StorageError};
use crate::PipelineError;

/// Files `fetch` brought back from the processing bucket
#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub archive: PathBuf,
    pub analysis: Option<PathBuf>,
    pub bytes: u64,
}

impl Pipeline {
    /// Download the archive and analysis document of a video from the processing bucket
    pub async fn fetch(&self, config: &RunConfig) -> Result<FetchSummary> {
        let store = S3Store::connect(&config.storage).await;
        self.fetch_from(&store, config).await
    }

    async fn fetch_from(&self, store: &dyn ObjectStore, config: &RunConfig) -> Result<FetchSummary> {
        let video_id = config.video_id.as_str();
        let bucket = &config.storage.bucket;
        let dest_dir = output::video_dir(&self.settings.workspace.temp_dir, video_id);

        let archive_filename = output::archive_filename(video_id);
        let archive_key = object_key(video_id, &archive_filename);

        tracing::info!("Checking s3://{}/{}", bucket, archive_key);
        match store.exists(&archive_key).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!("Archive not found: {}", archive_key);
                log_hints(
                    StorageError::NotFound {
                        key: archive_key.clone(),
                    }
                    .hints(),
                );
                return Err(PipelineError::ObjectMissing {
                    bucket: bucket.clone(),
                    key: archive_key,
                }
                .into());
            }
            Err(e) => {
                tracing::error!("{}", e);
                log_hints(e.hints());
                return Err(e).context("Failed to check the processing bucket");
            }
        }

        let archive = dest_dir.join(&archive_filename);
        let mut bytes = store
            .download_file(&archive_key, &archive)
            .await
            .with_context(|| format!("Failed to download {}", archive_key))?;
        tracing::info!(
            "Downloaded {} ({})",
            archive.display(),
            crate::utils::format_file_size(bytes)
        );

        let analysis_filename = output::analysis_filename(video_id);
        let analysis_key = object_key(video_id, &analysis_filename);
        let analysis_path = dest_dir.join(&analysis_filename);
        let analysis = match store.download_file(&analysis_key, &analysis_path).await {
            Ok(size) => {
                bytes += size;
                match AnalysisDocument::load(&analysis_path) {
                    Ok(document) => {
                        tracing::info!(
                            "Analysis: {} segments, {} transcript entries",
                            document.segments.len(),
                            document.transcript.len()
                        );
                        Some(analysis_path)
                    }
                    Err(e) => {
                        tracing::warn!("Analysis document ignored: {:#}", e);
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Analysis document not downloaded: {}", e);
                None
            }
        };

        Ok(FetchSummary {
            archive,
            analysis,
            bytes,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::super::test_support::{failing_tool_settings, run_config};
    use super::*;
    use crate::storage::MockObjectStore;

    #[tokio::test]
    async fn test_missing_archive_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let mut store = MockObjectStore::new();
        store
            .expect_exists()
            .withf(|key| key == "abc123/abc123.zip")
            .returning(|_| Ok(false));
        store.expect_download_file().times(0);

        let err = pipeline.fetch_from(&store, &run_config()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ObjectMissing { key, .. }) if key == "abc123/abc123.zip"
        ));
    }

    #[tokio::test]
    async fn test_access_denied_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let mut store = MockObjectStore::new();
        store.expect_exists().returning(|key| {
            Err(StorageError::AccessDenied {
                key: key.to_string(),
            })
        });
        store.expect_download_file().times(0);

        let err = pipeline.fetch_from(&store, &run_config()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_analysis_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let mut store = MockObjectStore::new();
        store.expect_exists().returning(|_| Ok(true));
        store.expect_download_file().returning(|key, _dest| {
            if key.ends_with(".zip") {
                Ok(1024)
            } else {
                Err(StorageError::NotFound {
                    key: key.to_string(),
                })
            }
        });

        let summary = pipeline.fetch_from(&store, &run_config()).await.unwrap();

        assert_eq!(summary.archive, dir.path().join("temp/abc123/abc123.zip"));
        assert_eq!(summary.analysis, None);
        assert_eq!(summary.bytes, 1024);
    }

    #[tokio::test]
    async fn test_analysis_document_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);

        let mut store = MockObjectStore::new();
        store.expect_exists().returning(|_| Ok(true));
        store.expect_download_file().returning(|key, dest| {
            fs_err::create_dir_all(dest.parent().unwrap()).unwrap();
            if key.ends_with(".zip") {
                fs_err::write(dest, b"zip").unwrap();
                Ok(3)
            } else {
                fs_err::write(dest, b"<html>not json</html>").unwrap();
                Ok(21)
            }
        });

        let summary = pipeline.fetch_from(&store, &run_config()).await.unwrap();

        assert_eq!(summary.analysis, None);
        assert_eq!(summary.bytes, 24);
    }

    #[tokio::test]
    async fn test_analysis_document_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(failing_tool_settings(dir.path()), false);
        let source = crate::extractors::VideoSource {
            video_id: "abc123".to_string(),
            path: dir.path().join("abc123.mp4"),
            info: crate::extractors::VideoInfo::fallback("abc123"),
        };
        let json = AnalysisDocument::new(&source, &[], &[]).to_json().unwrap();

        let mut store = MockObjectStore::new();
        store.expect_exists().returning(|_| Ok(true));
        store.expect_download_file().returning(move |_key, dest| {
            fs_err::create_dir_all(dest.parent().unwrap()).unwrap();
            fs_err::write(dest, &json).unwrap();
            Ok(json.len() as u64)
        });

        let summary = pipeline.fetch_from(&store, &run_config()).await.unwrap();

        assert_eq!(
            summary.analysis,
            Some(dir.path().join("temp/abc123/abc123_analysis.json"))
        );
    }
}
