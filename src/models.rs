use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::repository::Record;

/// A rentable vehicle. `available` is the storefront "listed" flag, not a
/// statement about any particular date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub transmission: String,
    pub fuel_type: String,
    pub seats: i32,
    pub price_per_day: f64,
    pub available: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub popularity: Option<i32>,
}

impl Car {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.make, self.model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Every status except `cancelled` holds the car for its dates.
    pub fn blocks_availability(self) -> bool {
        self != Self::Cancelled
    }

    /// Confirmed and completed bookings count as earned revenue and booked days.
    pub fn is_realized(self) -> bool {
        matches!(self, Self::Confirmed | Self::Completed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown booking status '{other}'.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub car_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Number of calendar days covered, counting both ends. Zero or negative
    /// when `to` precedes `from`.
    pub fn day_count(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Blacklisted,
}

impl FromStr for CustomerStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "blacklisted" => Ok(Self::Blacklisted),
            other => Err(format!("Unknown customer status '{other}'.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub driver_license: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    pub joined_date: NaiveDate,
    pub status: CustomerStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewBooking,
    BookingUpdate,
    BookingCancelled,
    CustomerUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default)]
    pub link_to: Option<String>,
    #[serde(default)]
    pub related_id: Option<String>,
    pub priority: NotificationPriority,
}

/// Audit trail entry for a booking; `changes` maps field name to
/// `{"from": .., "to": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingHistory {
    pub id: String,
    pub booking_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub status: BookingStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub changes: Map<String, Value>,
}

impl Record for Car {
    const TABLE: &'static str = "cars";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Booking {
    const TABLE: &'static str = "bookings";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Location {
    const TABLE: &'static str = "locations";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Customer {
    const TABLE: &'static str = "customers";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Notification {
    const TABLE: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for BookingHistory {
    const TABLE: &'static str = "booking_history";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{BookingStatus, DateRange};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn status_flags_follow_lifecycle() {
        assert!(BookingStatus::Pending.blocks_availability());
        assert!(!BookingStatus::Cancelled.blocks_availability());
        assert!(!BookingStatus::Pending.is_realized());
        assert!(BookingStatus::Confirmed.is_realized());
        assert!(BookingStatus::Completed.is_realized());
    }

    #[test]
    fn status_parses_both_spellings() {
        assert_eq!("Canceled".parse::<BookingStatus>(), Ok(BookingStatus::Cancelled));
        assert_eq!(" pending ".parse::<BookingStatus>(), Ok(BookingStatus::Pending));
        assert!("returned".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
    }

    #[test]
    fn range_day_count_is_inclusive() {
        let range = DateRange::new(date("2024-06-01"), date("2024-06-10"));
        assert_eq!(range.day_count(), 10);
        assert!(range.contains(date("2024-06-10")));
        assert!(!range.contains(date("2024-06-11")));
        let inverted = DateRange::new(date("2024-06-10"), date("2024-06-01"));
        assert!(inverted.day_count() <= 0);
    }
}
