use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::extractors::{TranscriptEntry, VideoSource};
use crate::segments::SegmentDescriptor;

/// Summary of a downloaded video: metadata, transcript and planned segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub transcript: Vec<TranscriptEntry>,
    pub segments: Vec<AnalysisSegment>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSegment {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub title: String,
    pub description: String,
    pub reason: String,
}

impl From<&SegmentDescriptor> for AnalysisSegment {
    fn from(segment: &SegmentDescriptor) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            duration: segment.duration(),
            title: segment.title.clone(),
            description: segment.description.clone(),
            reason: segment.reason.clone(),
        }
    }
}

impl AnalysisDocument {
    pub fn new(
        source: &VideoSource,
        transcript: &[TranscriptEntry],
        segments: &[SegmentDescriptor],
    ) -> Self {
        Self {
            video_id: source.video_id.clone(),
            title: source.info.title.clone(),
            description: source.info.description.clone(),
            duration: source.info.duration,
            transcript: transcript.to_vec(),
            segments: segments.iter().map(AnalysisSegment::from).collect(),
            generated_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize analysis document")
    }

    /// Write the document as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        fs_err::write(path, self.to_json()?).context("Failed to write analysis document")?;
        tracing::info!("Analysis saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read analysis document")?;
        serde_json::from_str(&content).context("Failed to parse analysis document")
    }
}
