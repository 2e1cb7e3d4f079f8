use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::{ObjectStore, StorageError};
use crate::config::StorageConfig;

/// S3-compatible bucket (Cloudflare R2 and friends) behind the [`ObjectStore`] trait
pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for the configured endpoint with static credentials and region `auto`
    pub async fn connect(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "environment",
        );

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(config.region())
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(true)
            .build();

        tracing::debug!("S3 client created for {}", config.endpoint);

        Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

/// Sort an SDK failure into not found / access denied / anything else
fn classify<E>(
    err: SdkError<E, HttpResponse>,
    operation: &'static str,
    key: &str,
) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());

    match status {
        Some(404) => StorageError::NotFound {
            key: key.to_string(),
        },
        Some(401) | Some(403) => StorageError::AccessDenied {
            key: key.to_string(),
        },
        _ => StorageError::Request {
            operation,
            key: key.to_string(),
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => match classify(err, "HeadObject", key) {
                StorageError::NotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        tokio::fs::metadata(path)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Request {
                operation: "ReadFile",
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("PUT s3://{}/{}", self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|err| classify(err, "PutObject", key))?;

        Ok(())
    }

    async fn upload_bytes(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        tracing::debug!("PUT s3://{}/{} ({} bytes)", self.bucket, key, bytes.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .send()
            .await
            .map_err(|err| classify(err, "PutObject", key))?;

        Ok(())
    }

    async fn download_file(&self, key: &str, dest: &Path) -> Result<u64, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(err, "GetObject", key))?;

        let io_error = |source: std::io::Error| StorageError::Io {
            path: dest.to_path_buf(),
            source,
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let mut file = tokio::fs::File::create(dest).await.map_err(io_error)?;

        let mut body = output.body;
        let mut written = 0u64;
        while let Some(chunk) = body.try_next().await.map_err(|e| StorageError::Request {
            operation: "GetObject",
            key: key.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)?;

        Ok(written)
    }
}
