use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, Postgres};
use std::time::Duration;

use super::{DatabaseError, NewVideoRecord, VideoRecord, VideoRepository};
use crate::config::DatabaseConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const CREATE_VIDEOS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id SERIAL PRIMARY KEY,
        video_id VARCHAR(100) NOT NULL UNIQUE,
        filename VARCHAR(255) NOT NULL,
        title VARCHAR(255),
        description TEXT,
        duration DOUBLE PRECISION,
        r2_url VARCHAR(500),
        r2_key VARCHAR(500),
        tiktok_description TEXT,
        created_at TIMESTAMP DEFAULT (now() AT TIME ZONE 'utc'),
        updated_at TIMESTAMP DEFAULT (now() AT TIME ZONE 'utc')
    )
"#;

const VIDEO_COLUMNS: &str = "id, video_id, filename, title, description, duration, \
     r2_url, r2_key, tiktok_description, created_at, updated_at";

/// [`VideoRepository`] backed by Postgres.
///
/// The pool holds a single connection; the pipeline is sequential.
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    /// Connect, check the connection with `SELECT 1` and make sure the table exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        tracing::info!("Connecting to database at {}", config.host());

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .test_before_acquire(true)
            .connect(config.url())
            .await
            .map_err(DatabaseError::Connection)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(DatabaseError::Connection)?;

        ensure_schema(&pool).await?;

        tracing::info!("Connected to database");
        Ok(Self { pool })
    }

    /// Close the pool, waiting for the connection to be returned
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Database connection closed");
    }
}

async fn ensure_schema<'e, E>(executor: E) -> Result<(), DatabaseError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(CREATE_VIDEOS_TABLE).execute(executor).await?;
    Ok(())
}

async fn find_video<'e, E>(executor: E, video_id: &str) -> Result<Option<VideoRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("SELECT {} FROM videos WHERE video_id = $1", VIDEO_COLUMNS);
    sqlx::query_as::<_, VideoRecord>(&sql)
        .bind(video_id)
        .fetch_optional(executor)
        .await
}

async fn upsert_video<'e, E>(executor: E, record: &NewVideoRecord) -> Result<VideoRecord, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        INSERT INTO videos (video_id, filename, title, description, duration, r2_url, r2_key,
                            tiktok_description, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now() AT TIME ZONE 'utc', now() AT TIME ZONE 'utc')
        ON CONFLICT (video_id) DO UPDATE
        SET r2_url = EXCLUDED.r2_url,
            r2_key = EXCLUDED.r2_key,
            updated_at = now() AT TIME ZONE 'utc'
        RETURNING {}
        "#,
        VIDEO_COLUMNS
    );

    sqlx::query_as::<_, VideoRecord>(&sql)
        .bind(&record.video_id)
        .bind(&record.filename)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.duration)
        .bind(&record.r2_url)
        .bind(&record.r2_key)
        .bind(&record.tiktok_description)
        .fetch_one(executor)
        .await
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn find_by_identifier(&self, video_id: &str) -> Result<Option<VideoRecord>, DatabaseError> {
        Ok(find_video(&self.pool, video_id).await?)
    }

    async fn upsert(&self, record: &NewVideoRecord) -> Result<VideoRecord, DatabaseError> {
        // Dropping the transaction on error rolls it back
        let mut tx = self.pool.begin().await?;
        let stored = upsert_video(&mut *tx, record).await?;
        tx.commit().await?;
        Ok(stored)
    }
}
