// Business logic services

pub mod background;
pub mod clock;
pub mod exercise_media;
pub mod plan_store;
pub mod progression;
pub mod training_log_service;
pub mod training_log_store;

pub use background::{DetachedTask, TaskSpawner, TokioTaskSpawner};
pub use clock::{Clock, SystemClock};
pub use exercise_media::{ExerciseMediaResolver, HttpMediaResolver};
pub use plan_store::{InMemoryPlanTemplateStore, PgPlanTemplateStore, PlanTemplateStore};
pub use training_log_service::{EngineSettings, MaterializedSession, TrainingLogService};
pub use training_log_store::{
    InMemoryTrainingLogStore, PgTrainingLogStore, StoreError, TrainingLogStore,
};
