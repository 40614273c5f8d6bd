use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let db_ok = if let Some(pool) = state.store.pool() {
        // Short timeout so health answers even when the first connection hangs.
        match tokio::time::timeout(
            Duration::from_secs(3),
            sqlx::query("SELECT 1").fetch_one(pool),
        )
        .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Health check DB query failed");
                false
            }
            Err(_) => {
                tracing::error!("Health check DB query timed out (3s)");
                false
            }
        }
    } else {
        true
    };

    let status = if db_ok { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "now": Utc::now().to_rfc3339(),
        "storage": state.store.backend_name(),
        "db": db_ok
    }))
}

#[cfg(test)]
mod tests {
    use axum::extract::State;

    use super::health;
    use crate::state::AppState;

    #[tokio::test]
    async fn memory_backend_reports_ok() {
        let body = health(State(AppState::for_tests())).await.0;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "memory");
    }
}
