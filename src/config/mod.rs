// Configuration loaded from the environment

pub mod app;
pub mod database;
pub mod seeding;

pub use app::{AppConfig, StorageBackend};
pub use database::{run_migrations, DatabaseConfig};
pub use seeding::PlanSeeder;
