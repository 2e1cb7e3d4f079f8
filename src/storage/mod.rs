use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub mod s3;

pub use s3::S3Store;

/// Object storage failures
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("access denied for {key}")]
    AccessDenied { key: String },

    #[error("{operation} failed for {key}: {message}")]
    Request {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("local file error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Troubleshooting hints for this failure, empty when there is nothing useful to say
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            StorageError::AccessDenied { .. } => &[
                "Verify the access key and secret key are correct",
                "Check the API token has object read/write permission",
                "Verify the bucket name",
            ],
            StorageError::NotFound { .. } => &["Make sure the video was ingested into this bucket first"],
            _ => &[],
        }
    }
}

/// Storage key of an artifact: `{video_id}/{filename}`
pub fn object_key(video_id: &str, filename: &str) -> String {
    format!("{}/{}", video_id, filename)
}

/// Content type for an artifact, by file extension
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp4") => "video/mp4",
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// The operations the pipeline needs from an S3-compatible bucket
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether an object exists (head request)
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Upload a local file
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Upload an in-memory byte buffer
    async fn upload_bytes(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Download an object to `dest`, returning the number of bytes written
    async fn download_file(&self, key: &str, dest: &Path) -> Result<u64, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("abc123", "abc123.zip"), "abc123/abc123.zip");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("clip.MP4"), "video/mp4");
        assert_eq!(content_type_for("abc123.zip"), "application/zip");
        assert_eq!(content_type_for("abc123_analysis.json"), "application/json");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_hints() {
        let denied = StorageError::AccessDenied { key: "k".to_string() };
        assert!(!denied.hints().is_empty());

        let request = StorageError::Request {
            operation: "PutObject",
            key: "k".to_string(),
            message: "boom".to_string(),
        };
        assert!(request.hints().is_empty());
    }
}
