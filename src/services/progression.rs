//! Pure progression rules for training logs.
//!
//! Nothing in here performs I/O, so every rule can be exercised directly with
//! hand-built logs and a fixed `now`.

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    ExerciseTemplate, MeasurementType, NextSet, SetLog, TrainingLog, TrainingLogStatus,
};

/// Position of a set inside a log: (exercise index, set index)
pub type SetPosition = (usize, usize);

/// Expand a template's set count into fresh, uncompleted sets.
///
/// Only the fields the measurement type cares about are seeded; the rest stay null.
pub fn seed_sets(template: &ExerciseTemplate) -> Vec<SetLog> {
    let (repetitions, duration, weight) = match template.measurement_type {
        MeasurementType::None => (template.repetitions, None, None),
        MeasurementType::Duration => (None, template.duration, None),
        MeasurementType::Weight => (template.repetitions, None, template.suggested_weight),
    };

    (0..template.sets)
        .map(|_| SetLog {
            repetitions,
            duration,
            weight,
            rest_after_set: template.rest_between_sets,
            completed: false,
        })
        .collect()
}

/// First uncompleted set, scanning exercises then sets in creation order
pub fn next_uncompleted(log: &TrainingLog) -> Option<SetPosition> {
    log.exercises.iter().enumerate().find_map(|(exercise_index, exercise)| {
        exercise
            .sets
            .iter()
            .position(|set| !set.completed)
            .map(|set_index| (exercise_index, set_index))
    })
}

/// Build the "what's next" view for `position`.
///
/// Totals are read from `log` itself, the same log `position` was computed on.
pub fn describe_next(
    log: &TrainingLog,
    (exercise_index, set_index): SetPosition,
    instructions: Option<String>,
) -> NextSet {
    let exercise = &log.exercises[exercise_index];
    let set = &exercise.sets[set_index];
    let total_exercises = log.exercises.len();
    let total_sets = exercise.sets.len();

    NextSet {
        log_id: log.id,
        exercise_id: exercise.id,
        exercise_name: exercise.name.clone(),
        exercise_image: exercise.image.clone(),
        instructions,
        measurement_type: exercise.measurement_type,
        exercise_index,
        exercise_number: exercise_index + 1,
        total_exercises,
        set_index,
        set_number: set_index + 1,
        total_sets,
        repetitions: set.repetitions,
        duration: set.duration,
        weight: set.weight,
        rest_after_set: set.rest_after_set,
        rest_after_exercise: exercise.rest_after_exercise,
        is_last_set_in_exercise: set_index + 1 == total_sets,
        is_last_exercise: exercise_index + 1 == total_exercises,
    }
}

fn elapsed_millis(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_milliseconds().max(0) as f64
}

pub fn elapsed_minutes(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (elapsed_millis(created_at, now) / 60_000.0).round() as i64
}

pub fn elapsed_seconds(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (elapsed_millis(created_at, now) / 1_000.0).round() as i64
}

/// Seconds to record when a training is finished.
/// A caller-supplied value wins (clamped at zero), otherwise the time since start.
pub fn resolve_total_duration(
    supplied: Option<f64>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> i64 {
    match supplied {
        Some(value) if value.is_finite() => value.round().max(0.0) as i64,
        _ => elapsed_seconds(created_at, now),
    }
}

/// Status an abandoned log should move to, if any.
///
/// Only in-progress logs strictly older than `window` are affected. Applying the
/// result and calling again yields `None`.
pub fn stale_transition(
    log: &TrainingLog,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<TrainingLogStatus> {
    if log.status == TrainingLogStatus::InProgress && now - log.created_at > window {
        Some(TrainingLogStatus::Aborted)
    } else {
        None
    }
}

/// Mark every remaining set completed
pub fn complete_all_sets(log: &mut TrainingLog) {
    for set in log.exercises.iter_mut().flat_map(|exercise| exercise.sets.iter_mut()) {
        set.completed = true;
    }
}
