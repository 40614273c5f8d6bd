use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{
    auth::{login as open_session, require_admin, IssuedSession},
    error::AppResult,
    schemas::{validate_input, LoginInput},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/logout", axum::routing::post(logout))
        .route("/me", axum::routing::get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> AppResult<Json<IssuedSession>> {
    validate_input(&payload)?;
    let session = open_session(
        &state.config,
        &state.sessions,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok(Json(session))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let claims = require_admin(&state, &headers).await?;
    state.sessions.revoke(&claims.sid).await;
    tracing::info!(admin = %claims.sub, "Admin signed out");
    Ok(Json(json!({ "ok": true })))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let claims = require_admin(&state, &headers).await?;
    Ok(Json(json!({
        "email": claims.sub,
        "role": "admin",
        "session_expires_at": claims.exp,
    })))
}
