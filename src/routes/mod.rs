use axum::{routing::get, Router};

use crate::state::AppState;

pub mod bookings;
pub mod cars;
pub mod customers;
pub mod health;
pub mod identity;
pub mod locations;
pub mod notifications;
pub mod reports;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(identity::router())
        .merge(cars::router())
        .merge(locations::router())
        .merge(bookings::router())
        .merge(customers::router())
        .merge(notifications::router())
        .merge(reports::router())
}
