use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_admin,
    error::{AppError, AppResult},
    models::{Booking, Car, DateRange},
    schemas::{
        parse_date, validate_input, AvailabilityQuery, CarPath, CarsQuery, CreateCarInput,
        QuoteQuery, UpdateCarInput,
    },
    services::{availability::find_available, bookings::quote, fleet},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/cars", axum::routing::get(list_cars).post(create_car))
        .route("/cars/available", axum::routing::get(available_cars))
        .route(
            "/cars/{car_id}",
            axum::routing::get(get_car)
                .patch(update_car)
                .delete(delete_car),
        )
        .route("/cars/{car_id}/quote", axum::routing::get(quote_car))
}

async fn list_cars(
    State(state): State<AppState>,
    Query(query): Query<CarsQuery>,
) -> AppResult<Json<Value>> {
    let cars = fleet::list_cars(&state.store, &query).await?;
    Ok(Json(json!({ "data": cars })))
}

async fn available_cars(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Value>> {
    let range = query_range(&query.from, &query.to)?;
    let cars = state.store.list::<Car>().await?;
    let bookings = state.store.list::<Booking>().await?;
    let location_id = query
        .location_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let available = find_available(&cars, &bookings, range, location_id);
    Ok(Json(json!({
        "from": range.from,
        "to": range.to,
        "location_id": location_id,
        "data": available,
    })))
}

async fn get_car(
    State(state): State<AppState>,
    Path(path): Path<CarPath>,
) -> AppResult<Json<Car>> {
    Ok(Json(state.store.get::<Car>(&path.car_id).await?))
}

async fn quote_car(
    State(state): State<AppState>,
    Path(path): Path<CarPath>,
    Query(query): Query<QuoteQuery>,
) -> AppResult<impl IntoResponse> {
    let range = query_range(&query.from, &query.to)?;
    let car = state.store.get::<Car>(&path.car_id).await?;
    Ok(Json(quote(&car, range.from, range.to)))
}

async fn create_car(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCarInput>,
) -> AppResult<impl IntoResponse> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    let created = fleet::create_car(&state.store, payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn update_car(
    State(state): State<AppState>,
    Path(path): Path<CarPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCarInput>,
) -> AppResult<Json<Car>> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    Ok(Json(
        fleet::update_car(&state.store, &path.car_id, payload).await?,
    ))
}

async fn delete_car(
    State(state): State<AppState>,
    Path(path): Path<CarPath>,
    headers: HeaderMap,
) -> AppResult<Json<Car>> {
    let claims = require_admin(&state, &headers).await?;
    let deleted = fleet::delete_car(&state.store, &path.car_id).await?;
    tracing::info!(car_id = %deleted.id, admin = %claims.sub, "Car deleted");
    Ok(Json(deleted))
}

fn query_range(from: &str, to: &str) -> AppResult<DateRange> {
    let range = DateRange::new(parse_date(from)?, parse_date(to)?);
    if range.to < range.from {
        return Err(AppError::BadRequest(
            "'to' must not be before 'from'.".to_string(),
        ));
    }
    Ok(range)
}
