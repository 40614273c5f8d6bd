use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::AppConfig;

/// Lazily connecting pool, or `None` when no database is configured and the
/// in-memory store should be used.
pub fn create_pool(config: &AppConfig) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = config.database_url.as_deref() else {
        return Ok(None);
    };

    let max_connections = config.db_pool_max_connections.max(1);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(config.db_pool_min_connections.min(max_connections))
        .acquire_timeout(Duration::from_secs(
            config.db_pool_acquire_timeout_seconds.max(1),
        ))
        .idle_timeout(Some(Duration::from_secs(
            config.db_pool_idle_timeout_seconds,
        )))
        .connect_lazy(url)?;
    Ok(Some(pool))
}
