use corate_core::{EngineConfig, PgStore, RecommendationService};
use corate_migration::{Migrator, MigratorTrait};
use corate_server::{server, utils::AppState};
use corate_shared::{AppEnv, AppError};
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=debug,corate_core=debug", env!("CARGO_CRATE_NAME")).into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_error::ErrorLayer::default())
    .init();
  dotenvy::dotenv().ok();

  let app_env = AppEnv::from_env()?;
  let engine_config = EngineConfig::from_env(&app_env)?;
  tracing::info!(
    similarity = %engine_config.similarity,
    scoring_mode = %engine_config.scoring_mode,
    max_neighbors = ?engine_config.max_neighbors,
    "engine configured"
  );

  let db = Database::connect(app_env.database_url.as_str()).await?;

  // Apply all pending migrations
  // https://www.sea-ql.org/SeaORM/docs/migration/running-migration/#migrating-programmatically
  Migrator::up(&db, None).await?;

  let store = PgStore::new(db, engine_config.bound);
  let service = RecommendationService::new(store.clone(), store.clone(), &engine_config);

  server(
    app_env.bind_addr,
    AppState::new(service, store, app_env.request_timeout),
  )
  .await
}
