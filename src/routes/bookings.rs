use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_admin,
    error::AppResult,
    models::Booking,
    schemas::{
        validate_input, BookingPath, BookingReasonInput, BookingsQuery, CreateBookingInput,
        UpdateBookingInput,
    },
    services::bookings::{self, BookingAction},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/bookings", axum::routing::get(list_bookings).post(create_booking))
        .route(
            "/bookings/{booking_id}",
            axum::routing::get(get_booking)
                .patch(update_booking)
                .delete(delete_booking),
        )
        .route(
            "/bookings/{booking_id}/history",
            axum::routing::get(booking_history),
        )
        .route(
            "/bookings/{booking_id}/approve",
            axum::routing::post(approve_booking),
        )
        .route(
            "/bookings/{booking_id}/reject",
            axum::routing::post(reject_booking),
        )
        .route(
            "/bookings/{booking_id}/cancel",
            axum::routing::post(cancel_booking),
        )
        .route(
            "/bookings/{booking_id}/complete",
            axum::routing::post(complete_booking),
        )
}

/// Public: storefront booking request.
async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let created = bookings::create(&state.store, payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers).await?;
    let rows = bookings::list(
        &state.store,
        query.status.as_deref(),
        query.car_id.as_deref(),
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Booking>> {
    require_admin(&state, &headers).await?;
    Ok(Json(state.store.get::<Booking>(&path.booking_id).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateBookingInput>,
) -> AppResult<Json<Booking>> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    Ok(Json(
        bookings::update(&state.store, &path.booking_id, payload).await?,
    ))
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Booking>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        bookings::delete(&state.store, &path.booking_id).await?,
    ))
}

async fn booking_history(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers).await?;
    let entries = bookings::history(&state.store, &path.booking_id).await?;
    Ok(Json(json!({ "data": entries })))
}

async fn approve_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Booking>> {
    run_action(&state, &headers, &path.booking_id, BookingAction::Approve, None).await
}

async fn complete_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Booking>> {
    run_action(&state, &headers, &path.booking_id, BookingAction::Complete, None).await
}

async fn reject_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
    payload: Option<Json<BookingReasonInput>>,
) -> AppResult<Json<Booking>> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    validate_input(&input)?;
    run_action(
        &state,
        &headers,
        &path.booking_id,
        BookingAction::Reject,
        input.reason,
    )
    .await
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
    payload: Option<Json<BookingReasonInput>>,
) -> AppResult<Json<Booking>> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    validate_input(&input)?;
    run_action(
        &state,
        &headers,
        &path.booking_id,
        BookingAction::Cancel,
        input.reason,
    )
    .await
}

async fn run_action(
    state: &AppState,
    headers: &HeaderMap,
    booking_id: &str,
    action: BookingAction,
    reason: Option<String>,
) -> AppResult<Json<Booking>> {
    require_admin(state, headers).await?;
    Ok(Json(
        bookings::apply_action(&state.store, booking_id, action, reason).await?,
    ))
}
