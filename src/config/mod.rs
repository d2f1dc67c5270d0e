pub mod app;
pub mod database;

pub use app::{AppConfig, PostureThresholds, VisionConfig, DEFAULT_JWT_SECRET};
pub use database::{create_in_memory_pool, run_migrations, DatabaseConfig};
