use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_admin,
    error::AppResult,
    models::Notification,
    schemas::NotificationPath,
    services::notifications::{self, NotificationFeed},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/notifications",
            axum::routing::get(list_notifications).delete(clear_notifications),
        )
        .route(
            "/notifications/read-all",
            axum::routing::post(mark_all_notifications_read),
        )
        .route(
            "/notifications/{notification_id}",
            axum::routing::delete(delete_notification),
        )
        .route(
            "/notifications/{notification_id}/read",
            axum::routing::post(mark_notification_read),
        )
}

async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<NotificationFeed>> {
    require_admin(&state, &headers).await?;
    Ok(Json(notifications::feed(&state.store).await?))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(path): Path<NotificationPath>,
    headers: HeaderMap,
) -> AppResult<Json<Notification>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        notifications::mark_read(&state.store, &path.notification_id).await?,
    ))
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers).await?;
    let updated = notifications::mark_all_read(&state.store).await?;
    Ok(Json(json!({ "updated": updated })))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(path): Path<NotificationPath>,
    headers: HeaderMap,
) -> AppResult<Json<Notification>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        notifications::delete(&state.store, &path.notification_id).await?,
    ))
}

async fn clear_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers).await?;
    let deleted = notifications::clear_all(&state.store).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
