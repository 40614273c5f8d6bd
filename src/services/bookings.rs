use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    new_id, Booking, BookingHistory, BookingStatus, Car, DateRange, NotificationKind,
    NotificationPriority,
};
use crate::repository::FleetStore;
use crate::schemas::{serialize_to_map, CreateBookingInput, UpdateBookingInput};
use crate::services::{
    availability::is_car_free,
    customers,
    metrics::round2,
    notifications::{self, NewNotification},
    periods::stay_days,
};

/// Fields compared when recording what an edit changed.
const TRACKED_FIELDS: &[&str] = &[
    "car_id",
    "name",
    "email",
    "phone",
    "start_date",
    "end_date",
    "total_price",
    "status",
    "location_id",
];

pub fn allowed_transition(current: BookingStatus, next: BookingStatus) -> bool {
    matches!(
        (current, next),
        (BookingStatus::Pending, BookingStatus::Confirmed)
            | (BookingStatus::Pending, BookingStatus::Cancelled)
            | (BookingStatus::Confirmed, BookingStatus::Completed)
            | (BookingStatus::Confirmed, BookingStatus::Cancelled)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub car_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub price_per_day: f64,
    pub total_price: f64,
}

pub fn quote(car: &Car, start: NaiveDate, end: NaiveDate) -> PriceQuote {
    let days = stay_days(start, end);
    PriceQuote {
        car_id: car.id.clone(),
        start_date: start,
        end_date: end,
        days,
        price_per_day: car.price_per_day,
        total_price: round2(days as f64 * car.price_per_day),
    }
}

/// Admin workflow actions on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Approve,
    Reject,
    Cancel,
    Complete,
}

impl BookingAction {
    fn from_status(self) -> BookingStatus {
        match self {
            Self::Approve | Self::Reject => BookingStatus::Pending,
            Self::Cancel | Self::Complete => BookingStatus::Confirmed,
        }
    }

    fn to_status(self) -> BookingStatus {
        match self {
            Self::Approve => BookingStatus::Confirmed,
            Self::Reject | Self::Cancel => BookingStatus::Cancelled,
            Self::Complete => BookingStatus::Completed,
        }
    }

    fn history_action(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Cancel => "cancelled",
            Self::Complete => "completed",
        }
    }

    fn notification(self, booking: &Booking, reason: Option<&str>) -> NewNotification {
        let (kind, title, priority) = match self {
            Self::Approve => (
                NotificationKind::BookingUpdate,
                "Booking Approved",
                NotificationPriority::Medium,
            ),
            Self::Reject => (
                NotificationKind::BookingUpdate,
                "Booking Rejected",
                NotificationPriority::High,
            ),
            Self::Cancel => (
                NotificationKind::BookingCancelled,
                "Booking Cancelled",
                NotificationPriority::High,
            ),
            Self::Complete => (
                NotificationKind::BookingUpdate,
                "Booking Completed",
                NotificationPriority::Low,
            ),
        };
        let message = match reason {
            Some(reason) => format!(
                "Booking #{} has been {}: {reason}",
                booking.id,
                self.history_action()
            ),
            None => format!("Booking #{} has been {}", booking.id, self.history_action()),
        };
        booking_notification(booking, kind, title, message, priority)
    }
}

fn booking_notification(
    booking: &Booking,
    kind: NotificationKind,
    title: &str,
    message: String,
    priority: NotificationPriority,
) -> NewNotification {
    NewNotification {
        kind,
        title: title.to_string(),
        message,
        priority,
        link_to: Some(format!("/admin/bookings/{}", booking.id)),
        related_id: Some(booking.id.clone()),
    }
}

async fn record_history(
    store: &FleetStore,
    booking: &Booking,
    action: &str,
    reason: Option<String>,
    changes: Map<String, Value>,
) -> AppResult<BookingHistory> {
    let entry = BookingHistory {
        id: new_id(),
        booking_id: booking.id.clone(),
        timestamp: Utc::now(),
        action: action.to_string(),
        status: booking.status,
        reason,
        changes,
    };
    store.put(&entry).await
}

/// `{"field": {"from": old, "to": new}}` for every tracked field that differs.
fn diff_tracked(before: &Booking, after: &Booking) -> Map<String, Value> {
    let before = serialize_to_map(before);
    let after = serialize_to_map(after);
    let mut changes = Map::new();
    for field in TRACKED_FIELDS {
        let old = before.get(*field).cloned().unwrap_or(Value::Null);
        let new = after.get(*field).cloned().unwrap_or(Value::Null);
        if old != new {
            changes.insert((*field).to_string(), json!({ "from": old, "to": new }));
        }
    }
    changes
}

async fn bookable_car(store: &FleetStore, car_id: &str) -> AppResult<Car> {
    let car = store
        .find::<Car>(car_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found.".to_string()))?;
    if !car.available {
        return Err(AppError::Conflict(
            "This car is not currently offered for rent.".to_string(),
        ));
    }
    Ok(car)
}

async fn ensure_free(
    store: &FleetStore,
    car_id: &str,
    range: DateRange,
    ignore_booking_id: Option<&str>,
) -> AppResult<()> {
    let bookings = store.list_where::<Booking>("car_id", car_id).await?;
    if is_car_free(car_id, &bookings, range, ignore_booking_id) {
        return Ok(());
    }
    Err(AppError::Conflict(
        "The car is already booked for the selected dates.".to_string(),
    ))
}

fn ensure_dates(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if end <= start {
        return Err(AppError::UnprocessableEntity(
            "end_date must be after start_date.".to_string(),
        ));
    }
    Ok(())
}

/// Public booking request: checks the car is listed and free, prices the
/// stay, links the customer and leaves the booking pending for approval.
pub async fn create(store: &FleetStore, input: CreateBookingInput) -> AppResult<Booking> {
    ensure_dates(input.start_date, input.end_date)?;
    let range = DateRange::new(input.start_date, input.end_date);

    let _guard = store.lock_booking_writes().await;
    let car = bookable_car(store, &input.car_id).await?;
    ensure_free(store, &car.id, range, None).await?;
    let customer = customers::link_or_create(store, &input.name, &input.email, &input.phone).await?;

    let booking = Booking {
        id: new_id(),
        car_id: car.id.clone(),
        customer_id: Some(customer.id),
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        phone: input.phone.trim().to_string(),
        start_date: input.start_date,
        end_date: input.end_date,
        total_price: quote(&car, input.start_date, input.end_date).total_price,
        status: BookingStatus::Pending,
        created_at: Utc::now(),
        cancel_reason: None,
        location_id: input.location_id.or_else(|| car.location_id.clone()),
    };
    let booking = store.put(&booking).await?;

    record_history(store, &booking, "created", None, Map::new()).await?;
    notifications::emit(
        store,
        booking_notification(
            &booking,
            NotificationKind::NewBooking,
            "New Booking",
            format!(
                "{} has booked the {} for {} - {}",
                booking.name,
                car.display_name(),
                booking.start_date,
                booking.end_date
            ),
            NotificationPriority::Medium,
        ),
    )
    .await?;

    tracing::info!(
        booking_id = %booking.id,
        car_id = %booking.car_id,
        status = %booking.status,
        total_price = booking.total_price,
        "Booking requested"
    );
    Ok(booking)
}

/// Admin edit. Re-prices when car or dates change, re-checks availability
/// against every other booking, and records changed fields in history.
pub async fn update(
    store: &FleetStore,
    booking_id: &str,
    input: UpdateBookingInput,
) -> AppResult<Booking> {
    let _guard = store.lock_booking_writes().await;
    let before = store.get::<Booking>(booking_id).await?;
    let mut booking = before.clone();

    if let Some(status) = input.status {
        if status != booking.status && !allowed_transition(booking.status, status) {
            return Err(AppError::UnprocessableEntity(format!(
                "Cannot change booking from {} to {}.",
                booking.status, status
            )));
        }
        booking.status = status;
    }
    if let Some(name) = input.name {
        booking.name = name.trim().to_string();
    }
    if let Some(email) = input.email {
        booking.email = email.trim().to_lowercase();
    }
    if let Some(phone) = input.phone {
        booking.phone = phone.trim().to_string();
    }
    if let Some(location_id) = input.location_id {
        booking.location_id = Some(location_id);
    }
    booking.car_id = input.car_id.unwrap_or(booking.car_id);
    booking.start_date = input.start_date.unwrap_or(booking.start_date);
    booking.end_date = input.end_date.unwrap_or(booking.end_date);

    let schedule_changed = booking.car_id != before.car_id
        || booking.start_date != before.start_date
        || booking.end_date != before.end_date;
    if schedule_changed {
        ensure_dates(booking.start_date, booking.end_date)?;
        let car = if booking.car_id != before.car_id {
            bookable_car(store, &booking.car_id).await?
        } else {
            store.get::<Car>(&booking.car_id).await?
        };
        booking.total_price = quote(&car, booking.start_date, booking.end_date).total_price;
    }
    if booking.status.blocks_availability() && (schedule_changed || !before.status.blocks_availability())
    {
        let range = DateRange::new(booking.start_date, booking.end_date);
        ensure_free(store, &booking.car_id, range, Some(&booking.id)).await?;
    }

    let changes = diff_tracked(&before, &booking);
    if changes.is_empty() {
        return Ok(before);
    }

    let booking = store.put(&booking).await?;
    record_history(store, &booking, "updated", None, changes).await?;
    if booking.status != before.status {
        notifications::emit(
            store,
            booking_notification(
                &booking,
                NotificationKind::BookingUpdate,
                "Booking Updated",
                format!(
                    "Booking #{} moved from {} to {}",
                    booking.id, before.status, booking.status
                ),
                NotificationPriority::Medium,
            ),
        )
        .await?;
    }

    tracing::info!(
        booking_id = %booking.id,
        car_id = %booking.car_id,
        status = %booking.status,
        "Booking updated"
    );
    Ok(booking)
}

pub async fn apply_action(
    store: &FleetStore,
    booking_id: &str,
    action: BookingAction,
    reason: Option<String>,
) -> AppResult<Booking> {
    let reason = reason
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let _guard = store.lock_booking_writes().await;
    let mut booking = store.get::<Booking>(booking_id).await?;
    if booking.status != action.from_status() {
        return Err(AppError::UnprocessableEntity(format!(
            "Only {} bookings can be {}; this one is {}.",
            action.from_status(),
            action.history_action(),
            booking.status
        )));
    }

    let previous = booking.status;
    booking.status = action.to_status();
    if booking.status == BookingStatus::Cancelled {
        booking.cancel_reason = reason.clone();
    }
    let booking = store.put(&booking).await?;

    let mut changes = Map::new();
    changes.insert(
        "status".to_string(),
        json!({ "from": previous, "to": booking.status }),
    );
    record_history(
        store,
        &booking,
        action.history_action(),
        reason.clone(),
        changes,
    )
    .await?;
    notifications::emit(store, action.notification(&booking, reason.as_deref())).await?;

    tracing::info!(
        booking_id = %booking.id,
        car_id = %booking.car_id,
        status = %booking.status,
        action = action.history_action(),
        "Booking workflow action applied"
    );
    Ok(booking)
}

pub async fn history(store: &FleetStore, booking_id: &str) -> AppResult<Vec<BookingHistory>> {
    store.get::<Booking>(booking_id).await?;
    let mut entries = store
        .list_where::<BookingHistory>("booking_id", booking_id)
        .await?;
    entries.sort_by(|left, right| left.timestamp.cmp(&right.timestamp));
    Ok(entries)
}

pub async fn list(
    store: &FleetStore,
    status: Option<&str>,
    car_id: Option<&str>,
) -> AppResult<Vec<Booking>> {
    let status = status
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse::<BookingStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let mut bookings = match car_id.map(str::trim).filter(|value| !value.is_empty()) {
        Some(car_id) => store.list_where::<Booking>("car_id", car_id).await?,
        None => store.list::<Booking>().await?,
    };
    if let Some(status) = status {
        bookings.retain(|booking| booking.status == status);
    }
    bookings.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    Ok(bookings)
}

/// Removes the booking together with its history.
pub async fn delete(store: &FleetStore, booking_id: &str) -> AppResult<Booking> {
    let _guard = store.lock_booking_writes().await;
    let booking = store.get::<Booking>(booking_id).await?;
    for entry in store
        .list_where::<BookingHistory>("booking_id", booking_id)
        .await?
    {
        store.delete::<BookingHistory>(&entry.id).await?;
    }
    let removed = store.delete::<Booking>(&booking.id).await?;
    tracing::info!(booking_id = %removed.id, car_id = %removed.car_id, "Booking deleted");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        allowed_transition, apply_action, create, delete, history, list, quote, update,
        BookingAction,
    };
    use crate::error::AppError;
    use crate::models::{
        BookingStatus, Car, Customer, CustomerStatus, Notification, NotificationKind,
    };
    use crate::repository::FleetStore;
    use crate::schemas::{CreateBookingInput, UpdateBookingInput};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn car(id: &str, price: f64, listed: bool) -> Car {
        Car {
            id: id.to_string(),
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2023,
            transmission: "Automatic".to_string(),
            fuel_type: "Hybrid".to_string(),
            seats: 5,
            price_per_day: price,
            available: listed,
            image: None,
            description: None,
            location_id: Some("loc1".to_string()),
            popularity: None,
        }
    }

    fn request(car_id: &str, start: &str, end: &str) -> CreateBookingInput {
        CreateBookingInput {
            car_id: car_id.to_string(),
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "555-0100".to_string(),
            start_date: date(start),
            end_date: date(end),
            location_id: None,
        }
    }

    async fn fleet() -> FleetStore {
        let store = FleetStore::in_memory();
        store.put(&car("c1", 50.0, true)).await.unwrap();
        store.put(&car("c2", 80.0, true)).await.unwrap();
        store.put(&car("c3", 40.0, false)).await.unwrap();
        store
    }

    #[test]
    fn transition_table() {
        use BookingStatus::*;
        assert!(allowed_transition(Pending, Confirmed));
        assert!(allowed_transition(Pending, Cancelled));
        assert!(allowed_transition(Confirmed, Completed));
        assert!(allowed_transition(Confirmed, Cancelled));
        assert!(!allowed_transition(Pending, Completed));
        assert!(!allowed_transition(Completed, Cancelled));
        assert!(!allowed_transition(Cancelled, Pending));
    }

    #[test]
    fn quote_bills_nights_with_one_day_minimum() {
        let rental = car("c1", 49.99, true);
        let week = quote(&rental, date("2024-06-10"), date("2024-06-17"));
        assert_eq!(week.days, 7);
        assert_eq!(week.total_price, 349.93);
        assert_eq!(quote(&rental, date("2024-06-10"), date("2024-06-10")).days, 1);
    }

    #[tokio::test]
    async fn create_prices_links_customer_and_notifies() {
        let store = fleet().await;
        let booking = create(&store, request("c1", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_price, 250.0);
        assert_eq!(booking.location_id.as_deref(), Some("loc1"));

        let customer = store
            .get::<Customer>(booking.customer_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(customer.email, "jane@example.com");

        let trail = history(&store, &booking.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "created");

        let kinds: Vec<NotificationKind> = store
            .list::<Notification>()
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![NotificationKind::CustomerUpdate, NotificationKind::NewBooking]
        );
    }

    #[tokio::test]
    async fn create_rejects_overlap_unlisted_and_bad_dates() {
        let store = fleet().await;
        create(&store, request("c1", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();

        let clash = create(&store, request("c1", "2024-06-15", "2024-06-18")).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let unlisted = create(&store, request("c3", "2024-06-10", "2024-06-12")).await;
        assert!(matches!(unlisted, Err(AppError::Conflict(_))));

        let missing = create(&store, request("nope", "2024-06-10", "2024-06-12")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let inverted = create(&store, request("c2", "2024-06-12", "2024-06-10")).await;
        assert!(matches!(inverted, Err(AppError::UnprocessableEntity(_))));

        assert!(create(&store, request("c1", "2024-06-16", "2024-06-18"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn blacklisted_customers_cannot_book() {
        let store = fleet().await;
        let first = create(&store, request("c1", "2024-06-10", "2024-06-12"))
            .await
            .unwrap();
        let mut customer = store
            .get::<Customer>(first.customer_id.as_deref().unwrap())
            .await
            .unwrap();
        customer.status = CustomerStatus::Blacklisted;
        store.put(&customer).await.unwrap();

        let refused = create(&store, request("c2", "2024-07-01", "2024-07-03")).await;
        assert!(matches!(refused, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn workflow_actions_follow_the_lifecycle() {
        let store = fleet().await;
        let booking = create(&store, request("c1", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();

        let early = apply_action(&store, &booking.id, BookingAction::Complete, None).await;
        assert!(matches!(early, Err(AppError::UnprocessableEntity(_))));

        let approved = apply_action(&store, &booking.id, BookingAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, BookingStatus::Confirmed);

        let cancelled = apply_action(
            &store,
            &booking.id,
            BookingAction::Cancel,
            Some("  Customer request ".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("Customer request"));

        let again = apply_action(&store, &booking.id, BookingAction::Reject, None).await;
        assert!(matches!(again, Err(AppError::UnprocessableEntity(_))));

        let actions: Vec<String> = history(&store, &booking.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec!["created", "approved", "cancelled"]);

        // Cancelled bookings free the car.
        assert!(create(&store, request("c1", "2024-06-12", "2024-06-13"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_reprices_and_ignores_own_dates() {
        let store = fleet().await;
        let booking = create(&store, request("c1", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();

        let extended = update(
            &store,
            &booking.id,
            UpdateBookingInput {
                end_date: Some(date("2024-06-17")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(extended.total_price, 350.0);

        let moved = update(
            &store,
            &booking.id,
            UpdateBookingInput {
                car_id: Some("c2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.total_price, 560.0);

        let trail = history(&store, &booking.id).await.unwrap();
        let last = trail.last().unwrap();
        assert_eq!(last.action, "updated");
        assert!(last.changes.contains_key("car_id"));
        assert!(last.changes.contains_key("total_price"));
        assert!(!last.changes.contains_key("name"));
    }

    #[tokio::test]
    async fn update_rejects_clash_and_bad_transition() {
        let store = fleet().await;
        let first = create(&store, request("c1", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();
        let second = create(&store, request("c1", "2024-06-20", "2024-06-22"))
            .await
            .unwrap();

        let clash = update(
            &store,
            &second.id,
            UpdateBookingInput {
                start_date: Some(date("2024-06-14")),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let skip = update(
            &store,
            &first.id,
            UpdateBookingInput {
                status: Some(BookingStatus::Completed),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(skip, Err(AppError::UnprocessableEntity(_))));

        let untouched = update(&store, &first.id, UpdateBookingInput::default())
            .await
            .unwrap();
        assert_eq!(untouched, first);
    }

    #[tokio::test]
    async fn list_filters_and_delete_drops_history() {
        let store = fleet().await;
        let first = create(&store, request("c1", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();
        create(&store, request("c2", "2024-06-10", "2024-06-15"))
            .await
            .unwrap();
        apply_action(&store, &first.id, BookingAction::Approve, None)
            .await
            .unwrap();

        assert_eq!(list(&store, Some("confirmed"), None).await.unwrap().len(), 1);
        assert_eq!(list(&store, None, Some("c2")).await.unwrap().len(), 1);
        assert_eq!(list(&store, None, None).await.unwrap().len(), 2);
        assert!(matches!(
            list(&store, Some("archived"), None).await,
            Err(AppError::BadRequest(_))
        ));

        delete(&store, &first.id).await.unwrap();
        assert!(matches!(
            history(&store, &first.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(list(&store, None, None).await.unwrap().len(), 1);
    }
}
