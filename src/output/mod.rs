use std::path::{Path, PathBuf};

pub mod analysis;
pub mod archive;

pub use analysis::{AnalysisDocument, AnalysisSegment};
pub use archive::{build_archive, SIDECAR_EXTENSIONS};

/// `{video_id}_analysis.json`
pub fn analysis_filename(video_id: &str) -> String {
    format!("{}_analysis.json", video_id)
}

/// `{video_id}.zip`
pub fn archive_filename(video_id: &str) -> String {
    format!("{}.zip", video_id)
}

/// Working directory of one video under `root`
pub fn video_dir(root: &Path, video_id: &str) -> PathBuf {
    root.join(video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        assert_eq!(analysis_filename("abc123"), "abc123_analysis.json");
        assert_eq!(archive_filename("abc123"), "abc123.zip");
        assert_eq!(
            video_dir(Path::new("temp"), "abc123"),
            PathBuf::from("temp/abc123")
        );
    }
}
