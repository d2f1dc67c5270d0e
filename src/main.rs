use anyhow::{bail, Context};
use physique_coach::api::create_routes;
use physique_coach::config::{run_migrations, AppConfig, DatabaseConfig};
use physique_coach::logging::init_tracing;
use physique_coach::services::pose_estimation_service::load_detector;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config);

    let issues = config.validate();
    for issue in &issues {
        warn!("Configuration issue: {}", issue);
    }
    if config.is_production() && !issues.is_empty() {
        bail!("Refusing to start in production with {} configuration issue(s)", issues.len());
    }

    let db_config = DatabaseConfig::from_env()?;
    let pool = db_config
        .create_pool()
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;
    info!("Database ready at {}", db_config.database_url);

    let detector = match load_detector(&config.vision) {
        Ok(detector) => detector,
        Err(err) => {
            error!("Failed to load pose model, photo analysis disabled: {:#}", err);
            None
        }
    };

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let app = create_routes(pool, &config, detector);

    let address = config.server_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("physique-coach listening on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutdown signal received");
}
