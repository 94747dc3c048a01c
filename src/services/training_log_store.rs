use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ExerciseLog, TrainingLog, TrainingLogStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Persistence for training logs.
///
/// Every lookup is scoped to the owning user. Writes after creation go through
/// `update_if_version`, which only succeeds while the stored version still
/// equals the version the caller read.
#[async_trait]
pub trait TrainingLogStore: Send + Sync {
    async fn insert(&self, log: &TrainingLog) -> Result<(), StoreError>;

    async fn find_for_user(
        &self,
        log_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TrainingLog>, StoreError>;

    /// Persist `log` if the stored version equals `expected_version`.
    /// `log.version` must already carry the new version. Returns false on a lost race.
    async fn update_if_version(
        &self,
        log: &TrainingLog,
        expected_version: i64,
    ) -> Result<bool, StoreError>;

    async fn latest_for_plan_day(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        weekday: u8,
    ) -> Result<Option<TrainingLog>, StoreError>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrainingLog>, StoreError>;

    async fn delete(&self, log_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    async fn count_with_status(
        &self,
        user_id: Uuid,
        status: TrainingLogStatus,
    ) -> Result<i64, StoreError>;

    /// Logs with `status` created strictly before `before`, newest first
    async fn with_status_before(
        &self,
        user_id: Uuid,
        status: TrainingLogStatus,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<TrainingLog>, StoreError>;
}

fn reject_preview(log: &TrainingLog) -> Result<(), StoreError> {
    if log.status == TrainingLogStatus::Preview {
        return Err(StoreError::InvalidRecord(
            "preview training logs are never persisted".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, FromRow)]
struct TrainingLogRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    weekday: i16,
    status: String,
    exercises: Json<Vec<ExerciseLog>>,
    total_duration: Option<i64>,
    rating: Option<i16>,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TrainingLogRow> for TrainingLog {
    type Error = StoreError;

    fn try_from(row: TrainingLogRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| StoreError::InvalidRecord(format!("unknown status '{}'", row.status)))?;
        let weekday = u8::try_from(row.weekday)
            .map_err(|_| StoreError::InvalidRecord(format!("weekday {} out of range", row.weekday)))?;

        Ok(TrainingLog {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            weekday,
            status,
            exercises: row.exercises.0,
            total_duration: row.total_duration,
            rating: row.rating,
            notes: row.notes,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, plan_id, weekday, status, exercises, total_duration, rating, notes, version, created_at, updated_at FROM training_logs";

#[derive(Clone)]
pub struct PgTrainingLogStore {
    db: PgPool,
}

impl PgTrainingLogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn rows_to_logs(rows: Vec<TrainingLogRow>) -> Result<Vec<TrainingLog>, StoreError> {
        rows.into_iter().map(TrainingLog::try_from).collect()
    }
}

#[async_trait]
impl TrainingLogStore for PgTrainingLogStore {
    async fn insert(&self, log: &TrainingLog) -> Result<(), StoreError> {
        reject_preview(log)?;

        sqlx::query(
            r#"
            INSERT INTO training_logs (id, user_id, plan_id, weekday, status, exercises, total_duration, rating, notes, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.plan_id)
        .bind(i16::from(log.weekday))
        .bind(log.status.as_str())
        .bind(Json(&log.exercises))
        .bind(log.total_duration)
        .bind(log.rating)
        .bind(&log.notes)
        .bind(log.version)
        .bind(log.created_at)
        .bind(log.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_for_user(
        &self,
        log_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TrainingLog>, StoreError> {
        let row = sqlx::query_as::<_, TrainingLogRow>(&format!(
            "{} WHERE id = $1 AND user_id = $2",
            SELECT_COLUMNS
        ))
        .bind(log_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(TrainingLog::try_from).transpose()
    }

    async fn update_if_version(
        &self,
        log: &TrainingLog,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        reject_preview(log)?;

        let result = sqlx::query(
            r#"
            UPDATE training_logs
            SET status = $4,
                exercises = $5,
                total_duration = $6,
                rating = $7,
                notes = $8,
                version = $9,
                updated_at = $10
            WHERE id = $1 AND user_id = $2 AND version = $3
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(expected_version)
        .bind(log.status.as_str())
        .bind(Json(&log.exercises))
        .bind(log.total_duration)
        .bind(log.rating)
        .bind(&log.notes)
        .bind(log.version)
        .bind(log.updated_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn latest_for_plan_day(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        weekday: u8,
    ) -> Result<Option<TrainingLog>, StoreError> {
        let row = sqlx::query_as::<_, TrainingLogRow>(&format!(
            "{} WHERE user_id = $1 AND plan_id = $2 AND weekday = $3 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(plan_id)
        .bind(i16::from(weekday))
        .fetch_optional(&self.db)
        .await?;

        row.map(TrainingLog::try_from).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrainingLog>, StoreError> {
        let rows = sqlx::query_as::<_, TrainingLogRow>(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Self::rows_to_logs(rows)
    }

    async fn delete(&self, log_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM training_logs WHERE id = $1 AND user_id = $2")
            .bind(log_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_with_status(
        &self,
        user_id: Uuid,
        status: TrainingLogStatus,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM training_logs WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    async fn with_status_before(
        &self,
        user_id: Uuid,
        status: TrainingLogStatus,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<TrainingLog>, StoreError> {
        let rows = sqlx::query_as::<_, TrainingLogRow>(&format!(
            "{} WHERE user_id = $1 AND status = $2 AND ($3::timestamptz IS NULL OR created_at < $3) ORDER BY created_at DESC LIMIT $4",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(status.as_str())
        .bind(before)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Self::rows_to_logs(rows)
    }
}

/// Training log store backed by a map, used in development mode and tests
#[derive(Default)]
pub struct InMemoryTrainingLogStore {
    logs: RwLock<HashMap<Uuid, TrainingLog>>,
}

impl InMemoryTrainingLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.logs.read().await.is_empty()
    }

    async fn filtered<F>(&self, user_id: Uuid, keep: F) -> Vec<TrainingLog>
    where
        F: Fn(&TrainingLog) -> bool,
    {
        let mut logs: Vec<TrainingLog> = self
            .logs
            .read()
            .await
            .values()
            .filter(|log| log.user_id == user_id && keep(log))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs
    }
}

fn page(logs: Vec<TrainingLog>, limit: i64, offset: i64) -> Vec<TrainingLog> {
    logs.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl TrainingLogStore for InMemoryTrainingLogStore {
    async fn insert(&self, log: &TrainingLog) -> Result<(), StoreError> {
        reject_preview(log)?;

        let mut logs = self.logs.write().await;
        if logs.contains_key(&log.id) {
            return Err(StoreError::InvalidRecord(format!(
                "training log {} already exists",
                log.id
            )));
        }
        logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn find_for_user(
        &self,
        log_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TrainingLog>, StoreError> {
        Ok(self
            .logs
            .read()
            .await
            .get(&log_id)
            .filter(|log| log.user_id == user_id)
            .cloned())
    }

    async fn update_if_version(
        &self,
        log: &TrainingLog,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        reject_preview(log)?;

        let mut logs = self.logs.write().await;
        match logs.get_mut(&log.id) {
            Some(stored) if stored.user_id == log.user_id && stored.version == expected_version => {
                *stored = log.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn latest_for_plan_day(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        weekday: u8,
    ) -> Result<Option<TrainingLog>, StoreError> {
        Ok(self
            .filtered(user_id, |log| log.plan_id == plan_id && log.weekday == weekday)
            .await
            .into_iter()
            .next())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrainingLog>, StoreError> {
        Ok(page(self.filtered(user_id, |_| true).await, limit, offset))
    }

    async fn delete(&self, log_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut logs = self.logs.write().await;
        if logs.get(&log_id).map(|log| log.user_id) == Some(user_id) {
            logs.remove(&log_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn count_with_status(
        &self,
        user_id: Uuid,
        status: TrainingLogStatus,
    ) -> Result<i64, StoreError> {
        Ok(self.filtered(user_id, |log| log.status == status).await.len() as i64)
    }

    async fn with_status_before(
        &self,
        user_id: Uuid,
        status: TrainingLogStatus,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<TrainingLog>, StoreError> {
        let logs = self
            .filtered(user_id, |log| {
                log.status == status && before.map_or(true, |before| log.created_at < before)
            })
            .await;
        Ok(page(logs, limit, 0))
    }
}
