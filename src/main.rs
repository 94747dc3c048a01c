use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use training_log::api::routes::create_routes;
use training_log::auth::JwtService;
use training_log::config::{run_migrations, AppConfig, DatabaseConfig, PlanSeeder, StorageBackend};
use training_log::services::{
    HttpMediaResolver, InMemoryPlanTemplateStore, InMemoryTrainingLogStore, PgPlanTemplateStore,
    PgTrainingLogStore, PlanTemplateStore, TokioTaskSpawner, TrainingLogService, TrainingLogStore,
};

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Initialize tracing; RUST_LOG takes precedence over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let jwt_service = JwtService::new(&config.jwt_secret);

    let (logs, plans): (Arc<dyn TrainingLogStore>, Arc<dyn PlanTemplateStore>) =
        match config.storage_backend {
            StorageBackend::Postgres => {
                let database_config = DatabaseConfig::from_env()?;
                let pool = database_config.create_pool().await?;
                run_migrations(&pool).await?;
                info!("Connected to database and applied migrations");

                let logs: Arc<dyn TrainingLogStore> = Arc::new(PgTrainingLogStore::new(pool.clone()));
                let plans: Arc<dyn PlanTemplateStore> = Arc::new(PgPlanTemplateStore::new(pool));
                (logs, plans)
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage; all data is lost on restart");
                let plans = Arc::new(InMemoryPlanTemplateStore::new());

                if config.is_development() {
                    let demo_user = Uuid::new_v4();
                    let plan = PlanSeeder::new(plans.clone()).seed_demo_plan(demo_user).await;
                    let token = jwt_service.create_access_token(demo_user)?;
                    info!(plan_id = %plan.id, %demo_user, "Demo token: {}", token);
                }

                let logs: Arc<dyn TrainingLogStore> = Arc::new(InMemoryTrainingLogStore::new());
                let plans: Arc<dyn PlanTemplateStore> = plans;
                (logs, plans)
            }
        };

    let media = Arc::new(HttpMediaResolver::new(config.image_generation_url.clone())?);
    let training_log_service = TrainingLogService::new(
        logs,
        plans,
        media,
        Arc::new(TokioTaskSpawner),
        config.engine_settings(),
    );

    let app = create_routes(training_log_service, jwt_service, config.storage_backend);

    let listener = TcpListener::bind(config.server_address()).await?;
    info!("Training log server starting on http://{}", config.server_address());
    info!("Health check available at http://{}/health", config.server_address());

    axum::serve(listener, app).await?;

    Ok(())
}
