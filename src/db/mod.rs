//! Durable video records.
//!
//! Business logic talks to a [`VideoRepository`]; [`PgVideoRepository`] is the Postgres
//! implementation. The `videos` table is shared with the application that serves the clips,
//! so its shape follows that application's schema.

use async_trait::async_trait;
use chrono::NaiveDateTime;

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgVideoRepository;

#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Troubleshooting hints printed when the database cannot be reached
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            DatabaseError::Connection(_) => &[
                "Make sure DATABASE_URL is set in the workflow secrets",
                "Verify the database URL format is correct",
                "Check the database server is reachable from the CI runner",
                "Ensure the database credentials are valid",
            ],
            DatabaseError::Query(_) => &[],
        }
    }
}

/// A row of the `videos` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VideoRecord {
    pub id: i32,
    pub video_id: String,
    pub filename: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub r2_url: Option<String>,
    pub r2_key: Option<String>,
    pub tiktok_description: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl VideoRecord {
    /// A record with a storage URL has already been published
    pub fn is_published(&self) -> bool {
        self.r2_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Values written by an upsert.
///
/// On insert every field is stored; when a row with the same `video_id` exists only the
/// storage location is replaced and `updated_at` refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideoRecord {
    pub video_id: String,
    pub filename: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub r2_url: String,
    pub r2_key: String,
    pub tiktok_description: Option<String>,
}

/// Narrow persistence interface used by the publisher
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn find_by_identifier(&self, video_id: &str) -> Result<Option<VideoRecord>, DatabaseError>;

    async fn upsert(&self, record: &NewVideoRecord) -> Result<VideoRecord, DatabaseError>;
}
