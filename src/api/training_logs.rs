use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, patch, post, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthenticatedUser, JwtService};
use crate::error::TrainingLogError;
use crate::models::{
    AnalysisContext, CompleteSetRequest, CompleteTrainingRequest, LastSession, MeasuredValues,
    Progression, SetStatusRequest, StartTrainingRequest, TrainingLog, TrainingLogPreview,
    TrainingStats,
};
use crate::services::TrainingLogService;

#[derive(Debug, Deserialize)]
pub struct PlanDayQuery {
    pub plan_id: Uuid,
    pub weekday: u8,
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    /// Maximum number of items to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    /// Number of earlier completed logs to include (default: 3, max: 10)
    pub previous: Option<usize>,
}

#[derive(Clone)]
pub struct AppState {
    pub training_log_service: TrainingLogService,
}

pub fn training_log_routes(training_log_service: TrainingLogService, jwt_service: JwtService) -> Router {
    let shared_state = AppState {
        training_log_service,
    };

    Router::new()
        .route("/", get(list_training_logs).post(start_training_log))
        .route("/preview", get(preview_training_log))
        .route("/last", get(get_last_training_log))
        .route("/stats", get(get_training_stats))
        .route("/:log_id", get(get_training_log).delete(delete_training_log))
        .route("/:log_id/next", get(get_next_set))
        .route(
            "/:log_id/exercises/:exercise_id/sets/:set_index/complete",
            post(complete_set),
        )
        .route(
            "/:log_id/exercises/:exercise_id/sets/:set_index",
            patch(update_set),
        )
        .route("/:log_id/complete", post(complete_training))
        .route("/:log_id/status", put(set_training_log_status))
        .route("/:log_id/analysis", get(get_analysis_context))
        .with_state(shared_state)
        .layer(middleware::from_fn_with_state(jwt_service, jwt_auth_middleware))
}

/// Start a training log from a plan day
pub async fn start_training_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<StartTrainingRequest>, TrainingLogError>,
) -> Result<(StatusCode, Json<TrainingLog>), TrainingLogError> {
    let log = state
        .training_log_service
        .start_session(user.user_id, request.plan_id, request.weekday)
        .await?;

    Ok((StatusCode::CREATED, Json(log)))
}

/// Show what a training log for a plan day would contain without saving it
pub async fn preview_training_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<PlanDayQuery>, TrainingLogError>,
) -> Result<Json<TrainingLogPreview>, TrainingLogError> {
    let preview = state
        .training_log_service
        .preview_session(user.user_id, query.plan_id, query.weekday)
        .await?;

    Ok(Json(preview))
}

/// Get the most recent training log for a plan day
pub async fn get_last_training_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<PlanDayQuery>, TrainingLogError>,
) -> Result<Json<LastSession>, TrainingLogError> {
    let last = state
        .training_log_service
        .last_session(user.user_id, query.plan_id, query.weekday)
        .await?;

    Ok(Json(last))
}

pub async fn get_training_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<TrainingStats>, TrainingLogError> {
    let stats = state.training_log_service.stats(user.user_id).await?;
    Ok(Json(stats))
}

pub async fn list_training_logs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Query(pagination), _): WithRejection<Query<PaginationQuery>, TrainingLogError>,
) -> Result<Json<Vec<TrainingLog>>, TrainingLogError> {
    let logs = state
        .training_log_service
        .list_sessions(user.user_id, pagination.limit, pagination.offset)
        .await?;

    Ok(Json(logs))
}

pub async fn get_training_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path(log_id), _): WithRejection<Path<Uuid>, TrainingLogError>,
) -> Result<Json<TrainingLog>, TrainingLogError> {
    let log = state
        .training_log_service
        .get_session(log_id, user.user_id)
        .await?;

    Ok(Json(log))
}

pub async fn delete_training_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path(log_id), _): WithRejection<Path<Uuid>, TrainingLogError>,
) -> Result<StatusCode, TrainingLogError> {
    state
        .training_log_service
        .delete_session(log_id, user.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get the next set to perform, or the completion summary
pub async fn get_next_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path(log_id), _): WithRejection<Path<Uuid>, TrainingLogError>,
) -> Result<Json<Progression>, TrainingLogError> {
    let progression = state
        .training_log_service
        .next_set(log_id, user.user_id)
        .await?;

    Ok(Json(progression))
}

/// Complete a set and return what comes next
pub async fn complete_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path((log_id, exercise_id, set_index)), _): WithRejection<
        Path<(Uuid, Uuid, usize)>,
        TrainingLogError,
    >,
    WithRejection(Json(request), _): WithRejection<Json<CompleteSetRequest>, TrainingLogError>,
) -> Result<Json<Progression>, TrainingLogError> {
    let progression = state
        .training_log_service
        .complete_set(log_id, exercise_id, set_index, user.user_id, request)
        .await?;

    Ok(Json(progression))
}

/// Correct the measured values of a set without touching its completion
pub async fn update_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path((log_id, exercise_id, set_index)), _): WithRejection<
        Path<(Uuid, Uuid, usize)>,
        TrainingLogError,
    >,
    WithRejection(Json(values), _): WithRejection<Json<MeasuredValues>, TrainingLogError>,
) -> Result<Json<TrainingLog>, TrainingLogError> {
    let log = state
        .training_log_service
        .update_set(log_id, exercise_id, set_index, user.user_id, values)
        .await?;

    Ok(Json(log))
}

pub async fn complete_training(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path(log_id), _): WithRejection<Path<Uuid>, TrainingLogError>,
    WithRejection(Json(request), _): WithRejection<Json<CompleteTrainingRequest>, TrainingLogError>,
) -> Result<Json<TrainingLog>, TrainingLogError> {
    let log = state
        .training_log_service
        .complete_training(log_id, user.user_id, request)
        .await?;

    Ok(Json(log))
}

pub async fn set_training_log_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path(log_id), _): WithRejection<Path<Uuid>, TrainingLogError>,
    WithRejection(Json(request), _): WithRejection<Json<SetStatusRequest>, TrainingLogError>,
) -> Result<Json<TrainingLog>, TrainingLogError> {
    let log = state
        .training_log_service
        .set_status(log_id, user.user_id, &request.status)
        .await?;

    Ok(Json(log))
}

/// A completed log with its recent history, for feedback and calorie estimation
pub async fn get_analysis_context(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Path(log_id), _): WithRejection<Path<Uuid>, TrainingLogError>,
    WithRejection(Query(query), _): WithRejection<Query<AnalysisQuery>, TrainingLogError>,
) -> Result<Json<AnalysisContext>, TrainingLogError> {
    let context = state
        .training_log_service
        .analysis_context(log_id, user.user_id, query.previous)
        .await?;

    Ok(Json(context))
}
