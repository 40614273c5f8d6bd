use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{BookingStatus, CustomerStatus};

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid ISO date '{}'.", value.trim())))
}

pub fn serialize_to_map<T>(value: &T) -> Map<String, Value>
where
    T: serde::Serialize,
{
    let json = serde_json::to_value(value).unwrap_or_else(|_| Value::Object(Map::new()));
    json.as_object().cloned().unwrap_or_default()
}

fn default_true() -> bool {
    true
}
fn default_country_usa() -> String {
    "USA".to_string()
}
fn default_customer_status() -> CustomerStatus {
    CustomerStatus::Active
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateCarInput {
    #[validate(length(min = 1, max = 100))]
    pub make: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100))]
    pub year: i32,
    #[validate(length(min = 1, max = 50))]
    pub transmission: String,
    #[validate(length(min = 1, max = 50))]
    pub fuel_type: String,
    #[validate(range(min = 1, max = 15))]
    pub seats: i32,
    #[validate(range(min = 0.0))]
    pub price_per_day: f64,
    #[serde(default = "default_true")]
    pub available: bool,
    pub image: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub location_id: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub popularity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, Validate)]
pub struct UpdateCarInput {
    #[validate(length(min = 1, max = 100))]
    pub make: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub transmission: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub fuel_type: Option<String>,
    #[validate(range(min = 1, max = 15))]
    pub seats: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price_per_day: Option<f64>,
    pub available: Option<bool>,
    pub image: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub location_id: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub popularity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub zip_code: String,
    #[serde(default = "default_country_usa")]
    pub country: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLocationInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingInput {
    #[validate(length(min = 1))]
    pub car_id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 40))]
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBookingInput {
    #[validate(length(min = 1))]
    pub car_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 40))]
    pub phone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookingReasonInput {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 40))]
    pub phone: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    #[validate(length(max = 50))]
    pub driver_license: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default = "default_customer_status")]
    pub status: CustomerStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 40))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    #[validate(length(max = 50))]
    pub driver_license: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: Option<CustomerStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarsQuery {
    pub available_only: Option<bool>,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub from: String,
    pub to: String,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub car_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomersQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarPath {
    pub car_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationPath {
    pub location_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingPath {
    pub booking_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerPath {
    pub customer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPath {
    pub notification_id: String,
}
