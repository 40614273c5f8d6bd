use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_admin,
    error::AppResult,
    models::Location,
    schemas::{validate_input, LocationInput, LocationPath, UpdateLocationInput},
    services::fleet,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/locations", axum::routing::get(list_locations).post(create_location))
        .route(
            "/locations/{location_id}",
            axum::routing::get(get_location)
                .patch(update_location)
                .delete(delete_location),
        )
}

async fn list_locations(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let rows = state.store.list::<Location>().await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_location(
    State(state): State<AppState>,
    Path(path): Path<LocationPath>,
) -> AppResult<Json<Location>> {
    Ok(Json(state.store.get::<Location>(&path.location_id).await?))
}

async fn create_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LocationInput>,
) -> AppResult<impl IntoResponse> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    let created = fleet::create_location(&state.store, payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn update_location(
    State(state): State<AppState>,
    Path(path): Path<LocationPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateLocationInput>,
) -> AppResult<Json<Location>> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    Ok(Json(
        fleet::update_location(&state.store, &path.location_id, payload).await?,
    ))
}

async fn delete_location(
    State(state): State<AppState>,
    Path(path): Path<LocationPath>,
    headers: HeaderMap,
) -> AppResult<Json<Location>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        fleet::delete_location(&state.store, &path.location_id).await?,
    ))
}
