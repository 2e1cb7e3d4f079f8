//! Upload clips to object storage and record them in the video repository

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::StorageConfig;
use crate::db::{NewVideoRecord, VideoRepository};
use crate::extractors::VideoInfo;
use crate::segments::ClipArtifact;
use crate::storage::{object_key, ObjectStore};

const CLIP_CONTENT_TYPE: &str = "video/mp4";

/// Counts for one publish batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Already published by an earlier run
    pub skipped: usize,
    pub failed: usize,
}

impl PublishReport {
    /// A batch succeeds when something was published, or when it was entirely published before
    pub fn is_success(&self) -> bool {
        self.succeeded > 0 || (self.failed == 0 && self.skipped > 0)
    }
}

enum ClipOutcome {
    Published { url: String },
    AlreadyPublished,
}

/// Publishes the clips of one source video
pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
    repo: &'a dyn VideoRepository,
    storage: &'a StorageConfig,
    video_id: &'a str,
    source: Option<&'a VideoInfo>,
}

impl<'a> Publisher<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        repo: &'a dyn VideoRepository,
        storage: &'a StorageConfig,
        video_id: &'a str,
    ) -> Self {
        Self {
            store,
            repo,
            storage,
            video_id,
            source: None,
        }
    }

    /// Metadata of the source video, used for clips cut without a known segment
    pub fn with_source(mut self, info: &'a VideoInfo) -> Self {
        self.source = Some(info);
        self
    }

    /// Publish every clip, one after another.
    ///
    /// A clip that fails is counted and logged; the remaining clips are still published.
    pub async fn publish_clips(&self, clips: &[ClipArtifact]) -> PublishReport {
        let mut report = PublishReport {
            attempted: clips.len(),
            ..Default::default()
        };

        for (i, clip) in clips.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, clips.len(), clip.filename);

            match self.publish_clip(clip).await {
                Ok(ClipOutcome::Published { url }) => {
                    tracing::info!("Published {} -> {}", clip.identifier, url);
                    report.succeeded += 1;
                }
                Ok(ClipOutcome::AlreadyPublished) => {
                    tracing::info!("Skipping {}: already published", clip.identifier);
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to publish {}: {:#}", clip.identifier, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Publish finished: {} succeeded, {} skipped, {} failed of {}",
            report.succeeded,
            report.skipped,
            report.failed,
            report.attempted
        );

        report
    }

    async fn publish_clip(&self, clip: &ClipArtifact) -> Result<ClipOutcome> {
        let existing = self
            .repo
            .find_by_identifier(&clip.identifier)
            .await
            .context("Failed to look up existing record")?;

        if existing.as_ref().is_some_and(|record| record.is_published()) {
            return Ok(ClipOutcome::AlreadyPublished);
        }

        let key = object_key(self.video_id, &clip.filename);
        let url = self
            .storage
            .object_url(&key)
            .context("No public URL configured for published clips")?;

        self.store
            .upload_file(&key, &clip.path, CLIP_CONTENT_TYPE, self.clip_metadata(clip))
            .await
            .with_context(|| format!("Upload of {} failed", key))?;

        match self.store.exists(&key).await {
            Ok(true) => tracing::debug!("Verified {}", key),
            Ok(false) => tracing::warn!("Uploaded object {} not visible yet", key),
            Err(e) => tracing::warn!("Could not verify upload of {}: {}", key, e),
        }

        self.repo
            .upsert(&self.new_record(clip, &key, &url))
            .await
            .context("Failed to save video record")?;

        Ok(ClipOutcome::Published { url })
    }

    fn clip_metadata(&self, clip: &ClipArtifact) -> HashMap<String, String> {
        HashMap::from([
            ("video_id".to_string(), self.video_id.to_string()),
            (
                "original_filename".to_string(),
                urlencoding::encode(&clip.filename).into_owned(),
            ),
        ])
    }

    fn new_record(&self, clip: &ClipArtifact, key: &str, url: &str) -> NewVideoRecord {
        let (title, description, duration) = match (&clip.segment, self.source) {
            (Some(segment), _) => (
                Some(segment.title.clone()),
                Some(segment.description.clone()),
                Some(segment.duration()),
            ),
            (None, Some(info)) => (Some(info.title.clone()), Some(info.description.clone()), None),
            (None, None) => (Some(clip.identifier.clone()), None, None),
        };

        NewVideoRecord {
            video_id: clip.identifier.clone(),
            filename: clip.filename.clone(),
            title,
            description,
            duration,
            r2_url: url.to_string(),
            r2_key: key.to_string(),
            tiktok_description: clip.segment.as_ref().map(|s| s.description.clone()),
        }
    }
}
