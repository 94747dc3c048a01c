use anyhow::anyhow;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, TrainingLogError};
use crate::models::{
    AnalysisContext, CompleteSetRequest, CompleteTrainingRequest, ExerciseLog, ExerciseWeight,
    LastSession, MeasuredValues, PlanDayTemplate, Progression, TrainingLog, TrainingLogPreview,
    TrainingLogStatus, TrainingStats,
};
use crate::services::background::TaskSpawner;
use crate::services::clock::{Clock, SystemClock};
use crate::services::exercise_media::ExerciseMediaResolver;
use crate::services::plan_store::PlanTemplateStore;
use crate::services::progression::{
    complete_all_sets, describe_next, elapsed_minutes, next_uncompleted, resolve_total_duration,
    seed_sets, stale_transition, SetPosition,
};
use crate::services::training_log_store::TrainingLogStore;

const MAX_WRITE_ATTEMPTS: u32 = 3;
const STATS_EXERCISE_COUNT: usize = 5;
const DEFAULT_ANALYSIS_HISTORY: usize = 3;
const MAX_ANALYSIS_HISTORY: usize = 10;
const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// In-progress logs older than this are aborted when read as "last session"
    pub session_expiration: Duration,
    /// Image used until a generated one is cached
    pub image_placeholder: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            session_expiration: Duration::minutes(30),
            image_placeholder: "/images/exercise-placeholder.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterializedSession {
    Persisted(TrainingLog),
    Preview(TrainingLogPreview),
}

/// Owns the lifecycle of training logs: creation from a plan day, set
/// progression, finalization, staleness and stats.
#[derive(Clone)]
pub struct TrainingLogService {
    logs: Arc<dyn TrainingLogStore>,
    plans: Arc<dyn PlanTemplateStore>,
    media: Arc<dyn ExerciseMediaResolver>,
    spawner: Arc<dyn TaskSpawner>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

fn validate_weekday(weekday: u8) -> Result<()> {
    if !(1..=7).contains(&weekday) {
        return Err(TrainingLogError::InvalidInput(format!(
            "weekday must be between 1 and 7, got {}",
            weekday
        )));
    }
    Ok(())
}

/// Stable exercise ids for previews, so repeated previews of a day compare equal
fn preview_exercise_id(plan_id: Uuid, weekday: u8, index: usize) -> Uuid {
    Uuid::new_v5(&plan_id, format!("{}:{}", weekday, index).as_bytes())
}

fn ensure_in_progress(log: &TrainingLog) -> Result<()> {
    if !log.is_in_progress() {
        return Err(TrainingLogError::InvalidState { status: log.status });
    }
    Ok(())
}

fn locate_set<'a>(
    log: &'a mut TrainingLog,
    exercise_id: Uuid,
    set_index: usize,
) -> Result<&'a mut ExerciseLog> {
    let exercise = log
        .exercise_mut(exercise_id)
        .ok_or_else(|| TrainingLogError::not_found("Exercise"))?;
    if set_index >= exercise.sets.len() {
        return Err(TrainingLogError::not_found("Set"));
    }
    Ok(exercise)
}

impl TrainingLogService {
    pub fn new(
        logs: Arc<dyn TrainingLogStore>,
        plans: Arc<dyn PlanTemplateStore>,
        media: Arc<dyn ExerciseMediaResolver>,
        spawner: Arc<dyn TaskSpawner>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            logs,
            plans,
            media,
            spawner,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // Materialization

    /// Build a training log from the plan day for `weekday`.
    ///
    /// With `persist` the log is stored as in-progress. Without it a preview is
    /// returned, which has no identity and is never written; a missing or empty
    /// day yields a preview without exercises instead of an error.
    #[instrument(skip(self))]
    pub async fn materialize_session(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        weekday: u8,
        persist: bool,
    ) -> Result<MaterializedSession> {
        validate_weekday(weekday)?;

        let plan = self
            .plans
            .find_plan_for_user(plan_id, user_id)
            .await?
            .ok_or_else(|| TrainingLogError::not_found("Training plan"))?;
        let day = plan.day(weekday);

        if !persist {
            let exercises = day
                .map(|day| {
                    self.materialize_exercises(day, |index| preview_exercise_id(plan_id, weekday, index))
                })
                .unwrap_or_default();
            return Ok(MaterializedSession::Preview(TrainingLogPreview {
                plan_id,
                weekday,
                status: TrainingLogStatus::Preview,
                exercises,
            }));
        }

        let day = day.ok_or_else(|| TrainingLogError::not_found("Training day"))?;
        if day.exercises.is_empty() {
            return Err(TrainingLogError::InvalidInput(format!(
                "training day {} has no exercises",
                weekday
            )));
        }

        let now = self.clock.now();
        let log = TrainingLog {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            weekday,
            status: TrainingLogStatus::InProgress,
            exercises: self.materialize_exercises(day, |_| Uuid::new_v4()),
            total_duration: None,
            rating: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.logs.insert(&log).await?;
        info!(training_log_id = %log.id, exercises = log.exercises.len(), "Started training log");

        Ok(MaterializedSession::Persisted(log))
    }

    pub async fn start_session(&self, user_id: Uuid, plan_id: Uuid, weekday: u8) -> Result<TrainingLog> {
        match self.materialize_session(user_id, plan_id, weekday, true).await? {
            MaterializedSession::Persisted(log) => Ok(log),
            MaterializedSession::Preview(_) => Err(anyhow!("persisted materialization returned a preview").into()),
        }
    }

    pub async fn preview_session(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        weekday: u8,
    ) -> Result<TrainingLogPreview> {
        match self.materialize_session(user_id, plan_id, weekday, false).await? {
            MaterializedSession::Preview(preview) => Ok(preview),
            MaterializedSession::Persisted(_) => Err(anyhow!("preview materialization persisted a log").into()),
        }
    }

    fn materialize_exercises(
        &self,
        day: &PlanDayTemplate,
        exercise_id: impl Fn(usize) -> Uuid,
    ) -> Vec<ExerciseLog> {
        day.exercises
            .iter()
            .enumerate()
            .map(|(index, template)| {
                let image = match self.media.find_cached_image(&template.key) {
                    Some(url) => url,
                    None => {
                        let media = self.media.clone();
                        let template = template.clone();
                        self.spawner.spawn_detached(
                            "exercise_image_generation",
                            Box::pin(async move { media.request_image_generation(template).await }),
                        );
                        self.settings.image_placeholder.clone()
                    }
                };

                ExerciseLog {
                    id: exercise_id(index),
                    name: template.name.clone(),
                    image,
                    exercise_key: template.key.clone(),
                    template_index: Some(index),
                    rest_after_exercise: template.rest_after_exercise,
                    measurement_type: template.measurement_type,
                    difficulty: None,
                    sets: seed_sets(template),
                }
            })
            .collect()
    }

    // Progression

    pub async fn next_set(&self, log_id: Uuid, user_id: Uuid) -> Result<Progression> {
        let log = self.find_log(log_id, user_id).await?;
        ensure_in_progress(&log)?;
        self.progression_for(&log).await
    }

    async fn progression_for(&self, log: &TrainingLog) -> Result<Progression> {
        match next_uncompleted(log) {
            Some(position) => {
                let instructions = self.current_instructions(log, position).await?;
                Ok(Progression::InProgress(describe_next(log, position, instructions)))
            }
            None => Ok(Progression::Completed {
                total_duration_minutes: elapsed_minutes(log.created_at, self.clock.now()),
            }),
        }
    }

    /// Instructions come from the plan as it is now, not as it was at creation
    async fn current_instructions(
        &self,
        log: &TrainingLog,
        (exercise_index, _): SetPosition,
    ) -> Result<Option<String>> {
        let plan = self.plans.find_plan_for_user(log.plan_id, log.user_id).await?;
        let exercise = &log.exercises[exercise_index];

        Ok(plan
            .as_ref()
            .and_then(|plan| plan.day(log.weekday))
            .and_then(|day| {
                // Same position first so repeated exercises keep their own instructions
                exercise
                    .template_index
                    .and_then(|index| day.exercises.get(index))
                    .filter(|template| template.key == exercise.exercise_key)
                    .or_else(|| day.exercise_by_key(&exercise.exercise_key))
            })
            .map(|template| template.instructions.clone()))
    }

    // Set completion and correction

    #[instrument(skip(self, request))]
    pub async fn complete_set(
        &self,
        log_id: Uuid,
        exercise_id: Uuid,
        set_index: usize,
        user_id: Uuid,
        request: CompleteSetRequest,
    ) -> Result<Progression> {
        let log = self
            .mutate(log_id, user_id, |log| {
                ensure_in_progress(log)?;
                let exercise = locate_set(log, exercise_id, set_index)?;
                let set = &mut exercise.sets[set_index];
                if set.completed {
                    return Err(TrainingLogError::AlreadyCompleted { exercise_id, set_index });
                }
                set.apply(&request.values);
                set.completed = true;
                if let Some(difficulty) = request.difficulty {
                    exercise.difficulty = Some(difficulty);
                }
                Ok(())
            })
            .await?;

        debug!(training_log_id = %log_id, %exercise_id, set_index, "Completed set");
        self.progression_for(&log).await
    }

    #[instrument(skip(self, values))]
    pub async fn update_set(
        &self,
        log_id: Uuid,
        exercise_id: Uuid,
        set_index: usize,
        user_id: Uuid,
        values: MeasuredValues,
    ) -> Result<TrainingLog> {
        self.mutate(log_id, user_id, |log| {
            ensure_in_progress(log)?;
            let exercise = locate_set(log, exercise_id, set_index)?;
            exercise.sets[set_index].apply(&values);
            Ok(())
        })
        .await
    }

    // Finalization

    #[instrument(skip(self, request))]
    pub async fn complete_training(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        request: CompleteTrainingRequest,
    ) -> Result<TrainingLog> {
        if let Some(rating) = request.rating {
            if !(1..=5).contains(&rating) {
                return Err(TrainingLogError::InvalidInput(format!(
                    "rating must be between 1 and 5, got {}",
                    rating
                )));
            }
        }

        let now = self.clock.now();
        let log = self
            .mutate(log_id, user_id, |log| {
                ensure_in_progress(log)?;
                complete_all_sets(log);
                log.status = TrainingLogStatus::Completed;
                log.total_duration =
                    Some(resolve_total_duration(request.total_duration, log.created_at, now));
                if request.rating.is_some() {
                    log.rating = request.rating;
                }
                if request.notes.is_some() {
                    log.notes = request.notes.clone();
                }
                Ok(())
            })
            .await?;

        info!(training_log_id = %log.id, total_duration = ?log.total_duration, "Completed training log");
        Ok(log)
    }

    /// Administrative override; assigns the status and nothing else
    #[instrument(skip(self))]
    pub async fn set_status(&self, log_id: Uuid, user_id: Uuid, status: &str) -> Result<TrainingLog> {
        let status = TrainingLogStatus::parse_persisted(status)?;
        self.mutate(log_id, user_id, |log| {
            log.status = status;
            Ok(())
        })
        .await
    }

    /// Most recent log for a plan day. An abandoned in-progress log is aborted
    /// here and reported as expired instead of being returned.
    #[instrument(skip(self))]
    pub async fn last_session(&self, user_id: Uuid, plan_id: Uuid, weekday: u8) -> Result<LastSession> {
        validate_weekday(weekday)?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(mut log) = self.logs.latest_for_plan_day(user_id, plan_id, weekday).await? else {
                return Ok(LastSession::None);
            };

            let now = self.clock.now();
            let Some(status) = stale_transition(&log, now, self.settings.session_expiration) else {
                return Ok(LastSession::Found { training_log: log });
            };

            let expected_version = log.version;
            log.status = status;
            log.version = expected_version + 1;
            log.updated_at = now;

            if self.logs.update_if_version(&log, expected_version).await? {
                info!(training_log_id = %log.id, "Aborted stale training log");
                return Ok(LastSession::Expired {
                    training_log_id: log.id,
                    message: format!(
                        "Your last training session was left unfinished for more than {} minutes and has been aborted.",
                        self.settings.session_expiration.num_minutes()
                    ),
                });
            }

            warn!(training_log_id = %log.id, attempt, "Training log changed while aborting, retrying");
        }

        Err(anyhow!("training log for plan {} kept changing concurrently", plan_id).into())
    }

    // Stats and analysis

    pub async fn stats(&self, user_id: Uuid) -> Result<TrainingStats> {
        let completed_sessions = self
            .logs
            .count_with_status(user_id, TrainingLogStatus::Completed)
            .await?;
        let latest = self
            .logs
            .with_status_before(user_id, TrainingLogStatus::Completed, None, 1)
            .await?
            .into_iter()
            .next();

        let Some(latest) = latest else {
            return Ok(TrainingStats {
                completed_sessions,
                ..TrainingStats::default()
            });
        };

        let last_plan_name = self
            .plans
            .find_plan_for_user(latest.plan_id, user_id)
            .await?
            .map(|plan| plan.name);

        let skip = latest.exercises.len().saturating_sub(STATS_EXERCISE_COUNT);
        let last_exercises = latest
            .exercises
            .iter()
            .skip(skip)
            .map(|exercise| ExerciseWeight {
                name: exercise.name.clone(),
                weight: exercise.sets.last().and_then(|set| set.weight),
            })
            .collect();

        Ok(TrainingStats {
            completed_sessions,
            last_session_date: Some(latest.created_at.date_naive()),
            last_plan_name,
            last_exercises,
        })
    }

    /// A completed log plus up to `previous` earlier completed logs, newest first
    pub async fn analysis_context(
        &self,
        log_id: Uuid,
        user_id: Uuid,
        previous: Option<usize>,
    ) -> Result<AnalysisContext> {
        let limit = previous
            .unwrap_or(DEFAULT_ANALYSIS_HISTORY)
            .min(MAX_ANALYSIS_HISTORY);

        let log = self.find_log(log_id, user_id).await?;
        if log.status != TrainingLogStatus::Completed {
            return Err(TrainingLogError::InvalidState { status: log.status });
        }

        let previous = self
            .logs
            .with_status_before(
                user_id,
                TrainingLogStatus::Completed,
                Some(log.created_at),
                limit as i64,
            )
            .await?;

        Ok(AnalysisContext {
            training_log: log,
            previous,
        })
    }

    // Management

    pub async fn get_session(&self, log_id: Uuid, user_id: Uuid) -> Result<TrainingLog> {
        self.find_log(log_id, user_id).await
    }

    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<TrainingLog>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = offset.unwrap_or(0);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(TrainingLogError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if offset < 0 {
            return Err(TrainingLogError::InvalidInput("offset must be non-negative".to_string()));
        }

        Ok(self.logs.list_for_user(user_id, limit, offset).await?)
    }

    pub async fn delete_session(&self, log_id: Uuid, user_id: Uuid) -> Result<()> {
        if !self.logs.delete(log_id, user_id).await? {
            return Err(TrainingLogError::not_found("Training log"));
        }
        info!(training_log_id = %log_id, "Deleted training log");
        Ok(())
    }

    async fn find_log(&self, log_id: Uuid, user_id: Uuid) -> Result<TrainingLog> {
        self.logs
            .find_for_user(log_id, user_id)
            .await?
            .ok_or_else(|| TrainingLogError::not_found("Training log"))
    }

    /// Read, validate and change a fresh copy, then write it only if nobody
    /// else wrote in between. A lost race re-reads and re-validates.
    async fn mutate<F>(&self, log_id: Uuid, user_id: Uuid, mut apply: F) -> Result<TrainingLog>
    where
        F: FnMut(&mut TrainingLog) -> Result<()> + Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut log = self.find_log(log_id, user_id).await?;
            let expected_version = log.version;

            apply(&mut log)?;
            log.version = expected_version + 1;
            log.updated_at = self.clock.now();

            if self.logs.update_if_version(&log, expected_version).await? {
                return Ok(log);
            }

            warn!(training_log_id = %log_id, attempt, "Training log changed concurrently, retrying");
        }

        Err(anyhow!("training log {} kept changing concurrently", log_id).into())
    }
}
