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
    models::Customer,
    schemas::{validate_input, CustomerInput, CustomerPath, CustomersQuery, UpdateCustomerInput},
    services::customers::{self, CustomerDetail},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/customers", axum::routing::get(list_customers).post(create_customer))
        .route(
            "/customers/{customer_id}",
            axum::routing::get(get_customer)
                .patch(update_customer)
                .delete(delete_customer),
        )
}

async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomersQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers).await?;
    let rows = customers::list(&state.store, &query).await?;
    Ok(Json(json!({ "data": rows })))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(path): Path<CustomerPath>,
    headers: HeaderMap,
) -> AppResult<Json<CustomerDetail>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        customers::detail(&state.store, &path.customer_id).await?,
    ))
}

async fn create_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CustomerInput>,
) -> AppResult<impl IntoResponse> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    let created = customers::create(&state.store, payload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(path): Path<CustomerPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCustomerInput>,
) -> AppResult<Json<Customer>> {
    require_admin(&state, &headers).await?;
    validate_input(&payload)?;
    Ok(Json(
        customers::update(&state.store, &path.customer_id, payload).await?,
    ))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(path): Path<CustomerPath>,
    headers: HeaderMap,
) -> AppResult<Json<Customer>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        customers::delete(&state.store, &path.customer_id).await?,
    ))
}
