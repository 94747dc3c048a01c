use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TrainingLogError;
use crate::models::MeasurementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingLogStatus {
    InProgress,
    Completed,
    Aborted,
    Canceled,
    /// Never persisted
    Preview,
}

impl TrainingLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingLogStatus::InProgress => "in-progress",
            TrainingLogStatus::Completed => "completed",
            TrainingLogStatus::Aborted => "aborted",
            TrainingLogStatus::Canceled => "canceled",
            TrainingLogStatus::Preview => "preview",
        }
    }

    /// Parse one of the statuses a stored log may carry. `preview` is rejected.
    pub fn parse_persisted(s: &str) -> Result<Self, TrainingLogError> {
        match s.parse()? {
            TrainingLogStatus::Preview => Err(TrainingLogError::InvalidInput(
                "status 'preview' cannot be assigned to a stored training log".to_string(),
            )),
            status => Ok(status),
        }
    }
}

impl fmt::Display for TrainingLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingLogStatus {
    type Err = TrainingLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-progress" => Ok(TrainingLogStatus::InProgress),
            "completed" => Ok(TrainingLogStatus::Completed),
            "aborted" => Ok(TrainingLogStatus::Aborted),
            "canceled" => Ok(TrainingLogStatus::Canceled),
            "preview" => Ok(TrainingLogStatus::Preview),
            other => Err(TrainingLogError::InvalidInput(format!(
                "unknown training log status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    pub repetitions: Option<i32>,
    pub duration: Option<i32>,
    pub weight: Option<f64>,
    pub rest_after_set: i32,
    pub completed: bool,
}

impl SetLog {
    /// Overwrite only the fields present in `values`.
    pub fn apply(&mut self, values: &MeasuredValues) {
        if let Some(repetitions) = values.repetitions {
            self.repetitions = Some(repetitions);
        }
        if let Some(duration) = values.duration {
            self.duration = Some(duration);
        }
        if let Some(weight) = values.weight {
            self.weight = Some(weight);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    /// Key of the originating `ExerciseTemplate`
    pub exercise_key: String,
    /// Position of the originating template within its plan day
    #[serde(default)]
    pub template_index: Option<usize>,
    pub rest_after_exercise: i32,
    pub measurement_type: MeasurementType,
    pub difficulty: Option<Difficulty>,
    pub sets: Vec<SetLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub weekday: u8,
    pub status: TrainingLogStatus,
    pub exercises: Vec<ExerciseLog>,
    /// Seconds
    pub total_duration: Option<i64>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingLog {
    pub fn is_in_progress(&self) -> bool {
        self.status == TrainingLogStatus::InProgress
    }

    pub fn exercise_mut(&mut self, exercise_id: Uuid) -> Option<&mut ExerciseLog> {
        self.exercises.iter_mut().find(|exercise| exercise.id == exercise_id)
    }
}

/// An unsaved training log; carries no identity or timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLogPreview {
    pub plan_id: Uuid,
    pub weekday: u8,
    pub status: TrainingLogStatus,
    pub exercises: Vec<ExerciseLog>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasuredValues {
    pub repetitions: Option<i32>,
    pub duration: Option<i32>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteSetRequest {
    #[serde(flatten)]
    pub values: MeasuredValues,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteTrainingRequest {
    /// Seconds
    pub total_duration: Option<f64>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTrainingRequest {
    pub plan_id: Uuid,
    pub weekday: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// The set a user should perform next, joined with exercise details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSet {
    pub log_id: Uuid,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub exercise_image: String,
    pub instructions: Option<String>,
    pub measurement_type: MeasurementType,
    pub exercise_index: usize,
    pub exercise_number: usize,
    pub total_exercises: usize,
    pub set_index: usize,
    pub set_number: usize,
    pub total_sets: usize,
    pub repetitions: Option<i32>,
    pub duration: Option<i32>,
    pub weight: Option<f64>,
    pub rest_after_set: i32,
    pub rest_after_exercise: i32,
    pub is_last_set_in_exercise: bool,
    pub is_last_exercise: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Progression {
    InProgress(NextSet),
    Completed { total_duration_minutes: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LastSession {
    Found { training_log: TrainingLog },
    Expired { training_log_id: Uuid, message: String },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseWeight {
    pub name: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub completed_sessions: i64,
    pub last_session_date: Option<NaiveDate>,
    pub last_plan_name: Option<String>,
    pub last_exercises: Vec<ExerciseWeight>,
}

/// A finalized log plus earlier completed logs, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub training_log: TrainingLog,
    pub previous: Vec<TrainingLog>,
}
