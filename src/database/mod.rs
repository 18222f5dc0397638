//! Postgres access: pool lifecycle plus the repositories backing the
//! payment layer's store traits.

pub mod domain_repository;
pub mod error;
pub mod gateway_config_repository;
pub mod process_repository;
pub mod transaction_repository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

use self::error::DatabaseError;
use crate::config::DatabaseConfig;

pub use domain_repository::DomainRepository;
pub use gateway_config_repository::GatewayConfigRepository;
pub use process_repository::PaymentProcessRepository;
pub use transaction_repository::TransactionRepository;

/// Open the connection pool and verify a connection can be acquired.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "initializing database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout.unwrap_or(600)))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
        .map_err(DatabaseError::from_sqlx)?;

    pool.acquire()
        .await
        .map_err(DatabaseError::from_sqlx)?;

    info!("database pool ready");
    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!("database health check failed: {}", e);
        DatabaseError::from_sqlx(e)
    })?;

    Ok(())
}
