use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which of repetitions, duration or weight is the authoritative measurement for a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    None,
    Duration,
    Weight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    pub name: String,
    /// Stable key used for image lookup and for joining instructions back into a log
    pub key: String,
    pub instructions: String,
    pub measurement_type: MeasurementType,
    pub sets: u32,
    pub repetitions: Option<i32>,
    /// Seconds
    pub duration: Option<i32>,
    pub suggested_weight: Option<f64>,
    /// Seconds
    pub rest_between_sets: i32,
    /// Seconds
    pub rest_after_exercise: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDayTemplate {
    pub weekday: u8,
    pub exercises: Vec<ExerciseTemplate>,
}

impl PlanDayTemplate {
    pub fn exercise_by_key(&self, key: &str) -> Option<&ExerciseTemplate> {
        self.exercises.iter().find(|exercise| exercise.key == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub days: Vec<PlanDayTemplate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingPlan {
    pub fn day(&self, weekday: u8) -> Option<&PlanDayTemplate> {
        self.days.iter().find(|day| day.weekday == weekday)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrainingPlan {
    pub user_id: Uuid,
    pub name: String,
    pub days: Vec<PlanDayTemplate>,
}
