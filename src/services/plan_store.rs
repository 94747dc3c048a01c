use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateTrainingPlan, PlanDayTemplate, TrainingPlan};
use crate::services::training_log_store::StoreError;

/// Read-only access to training plans and their day templates
#[async_trait]
pub trait PlanTemplateStore: Send + Sync {
    /// Returns the plan only when it belongs to `user_id`
    async fn find_plan_for_user(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TrainingPlan>, StoreError>;
}

#[derive(Debug, FromRow)]
struct TrainingPlanRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    days: Json<Vec<PlanDayTemplate>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TrainingPlanRow> for TrainingPlan {
    fn from(row: TrainingPlanRow) -> Self {
        TrainingPlan {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            days: row.days.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgPlanTemplateStore {
    db: PgPool,
}

impl PgPlanTemplateStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanTemplateStore for PgPlanTemplateStore {
    async fn find_plan_for_user(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TrainingPlan>, StoreError> {
        let row = sqlx::query_as::<_, TrainingPlanRow>(
            "SELECT id, user_id, name, days, created_at, updated_at FROM training_plans WHERE id = $1 AND user_id = $2",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(TrainingPlan::from))
    }
}

/// Plan store backed by a map, used in development mode and tests
#[derive(Default)]
pub struct InMemoryPlanTemplateStore {
    plans: RwLock<HashMap<Uuid, TrainingPlan>>,
}

impl InMemoryPlanTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_plan(&self, plan_data: CreateTrainingPlan) -> TrainingPlan {
        let now = Utc::now();
        let plan = TrainingPlan {
            id: Uuid::new_v4(),
            user_id: plan_data.user_id,
            name: plan_data.name,
            days: plan_data.days,
            created_at: now,
            updated_at: now,
        };
        self.plans.write().await.insert(plan.id, plan.clone());
        plan
    }

    /// Replace the days of an existing plan, as a plan edit would
    pub async fn replace_days(&self, plan_id: Uuid, days: Vec<PlanDayTemplate>) -> bool {
        match self.plans.write().await.get_mut(&plan_id) {
            Some(plan) => {
                plan.days = days;
                plan.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn remove_plan(&self, plan_id: Uuid) -> bool {
        self.plans.write().await.remove(&plan_id).is_some()
    }
}

#[async_trait]
impl PlanTemplateStore for InMemoryPlanTemplateStore {
    async fn find_plan_for_user(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TrainingPlan>, StoreError> {
        Ok(self
            .plans
            .read()
            .await
            .get(&plan_id)
            .filter(|plan| plan.user_id == user_id)
            .cloned())
    }
}
