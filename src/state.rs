use std::sync::Arc;

use crate::{
    auth::SessionStore, config::AppConfig, db::create_pool, repository::FleetStore,
    services::report_cache::ReportCache,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: FleetStore,
    pub report_cache: ReportCache,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, sqlx::Error> {
        let store = match create_pool(&config)? {
            Some(pool) => FleetStore::postgres(pool),
            None => {
                tracing::warn!("DATABASE_URL is not set; records are kept in memory only");
                FleetStore::in_memory()
            }
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: AppConfig, store: FleetStore) -> Self {
        let report_cache = ReportCache::new(
            config.report_response_cache_ttl_seconds,
            config.report_response_cache_max_entries,
        );
        let sessions = SessionStore::new(
            config.session_secret.as_deref(),
            config.session_ttl_seconds,
        );
        Self {
            config: Arc::new(config),
            store,
            report_cache,
            sessions,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::with_store(AppConfig::for_tests(), FleetStore::in_memory())
    }
}
