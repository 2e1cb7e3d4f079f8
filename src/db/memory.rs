use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{DatabaseError, NewVideoRecord, VideoRecord, VideoRepository};

/// In-memory [`VideoRepository`] with the same upsert semantics as the Postgres one
#[derive(Default)]
pub struct MemoryVideoRepository {
    rows: Mutex<HashMap<String, VideoRecord>>,
    fail_upserts_for: Mutex<Vec<String>>,
}

impl MemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: VideoRecord) {
        self.rows
            .lock()
            .unwrap()
            .insert(record.video_id.clone(), record);
    }

    pub fn get(&self, video_id: &str) -> Option<VideoRecord> {
        self.rows.lock().unwrap().get(video_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Make every upsert of `video_id` fail, leaving the stored rows untouched
    pub fn fail_upsert(&self, video_id: &str) {
        self.fail_upserts_for
            .lock()
            .unwrap()
            .push(video_id.to_string());
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn find_by_identifier(&self, video_id: &str) -> Result<Option<VideoRecord>, DatabaseError> {
        Ok(self.get(video_id))
    }

    async fn upsert(&self, record: &NewVideoRecord) -> Result<VideoRecord, DatabaseError> {
        if self
            .fail_upserts_for
            .lock()
            .unwrap()
            .contains(&record.video_id)
        {
            return Err(DatabaseError::Query(sqlx::Error::PoolTimedOut));
        }

        let now = Utc::now().naive_utc();
        let mut rows = self.rows.lock().unwrap();
        let next_id = rows.len() as i32 + 1;

        let stored = rows
            .entry(record.video_id.clone())
            .and_modify(|existing| {
                existing.r2_url = Some(record.r2_url.clone());
                existing.r2_key = Some(record.r2_key.clone());
                existing.updated_at = Some(now);
            })
            .or_insert_with(|| VideoRecord {
                id: next_id,
                video_id: record.video_id.clone(),
                filename: record.filename.clone(),
                title: record.title.clone(),
                description: record.description.clone(),
                duration: record.duration,
                r2_url: Some(record.r2_url.clone()),
                r2_key: Some(record.r2_key.clone()),
                tiktok_description: record.tiktok_description.clone(),
                created_at: Some(now),
                updated_at: Some(now),
            })
            .clone();

        Ok(stored)
    }
}
