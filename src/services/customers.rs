use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{
    new_id, Booking, Customer, CustomerStatus, NotificationKind, NotificationPriority,
};
use crate::repository::FleetStore;
use crate::schemas::{CustomerInput, CustomersQuery, UpdateCustomerInput};
use crate::services::metrics::round2;
use crate::services::notifications::{self, NewNotification};

/// A customer with booking totals derived from the booking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub customer: Customer,
    pub total_bookings: i64,
    /// Sum over confirmed and completed bookings.
    pub total_spent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub summary: CustomerSummary,
    pub bookings: Vec<Booking>,
}

pub fn rollup(customer: Customer, bookings: &[Booking]) -> CustomerSummary {
    let own = bookings
        .iter()
        .filter(|booking| booking.customer_id.as_deref() == Some(customer.id.as_str()));

    let mut total_bookings = 0;
    let mut total_spent = 0.0;
    for booking in own {
        total_bookings += 1;
        if booking.status.is_realized() {
            total_spent += booking.total_price;
        }
    }

    CustomerSummary {
        customer,
        total_bookings,
        total_spent: round2(total_spent),
    }
}

/// Case-insensitive substring match on name, e-mail or phone. A blank term
/// matches everyone.
pub fn matches_search(customer: &Customer, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [&customer.name, &customer.email, &customer.phone]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub async fn list(store: &FleetStore, query: &CustomersQuery) -> AppResult<Vec<CustomerSummary>> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<CustomerStatus>())
        .transpose()
        .map_err(AppError::BadRequest)?;

    let bookings = store.list::<Booking>().await?;
    let customers = store.list::<Customer>().await?;
    Ok(customers
        .into_iter()
        .filter(|customer| match status {
            Some(wanted) => customer.status == wanted,
            None => true,
        })
        .filter(|customer| matches_search(customer, query.search.as_deref().unwrap_or_default()))
        .map(|customer| rollup(customer, &bookings))
        .collect())
}

pub async fn detail(store: &FleetStore, customer_id: &str) -> AppResult<CustomerDetail> {
    let customer = store.get::<Customer>(customer_id).await?;
    let bookings = store.list_where::<Booking>("customer_id", customer_id).await?;
    Ok(CustomerDetail {
        summary: rollup(customer, &bookings),
        bookings,
    })
}

async fn find_by_email(store: &FleetStore, email: &str) -> AppResult<Option<Customer>> {
    let wanted = email.trim().to_lowercase();
    Ok(store
        .list::<Customer>()
        .await?
        .into_iter()
        .find(|customer| customer.email.to_lowercase() == wanted))
}

pub async fn create(store: &FleetStore, input: CustomerInput) -> AppResult<Customer> {
    if find_by_email(store, &input.email).await?.is_some() {
        return Err(AppError::Conflict(
            "A customer with this email already exists.".to_string(),
        ));
    }

    let customer = Customer {
        id: new_id(),
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        phone: input.phone.trim().to_string(),
        address: input.address,
        city: input.city,
        state: input.state,
        zip_code: input.zip_code,
        country: input.country,
        driver_license: input.driver_license,
        date_of_birth: input.date_of_birth,
        joined_date: Utc::now().date_naive(),
        status: input.status,
        notes: input.notes,
    };
    store.put(&customer).await
}

pub async fn update(
    store: &FleetStore,
    customer_id: &str,
    input: UpdateCustomerInput,
) -> AppResult<Customer> {
    let mut customer = store.get::<Customer>(customer_id).await?;

    if let Some(email) = input.email {
        let email = email.trim().to_lowercase();
        if email != customer.email {
            if let Some(other) = find_by_email(store, &email).await? {
                if other.id != customer.id {
                    return Err(AppError::Conflict(
                        "A customer with this email already exists.".to_string(),
                    ));
                }
            }
            customer.email = email;
        }
    }
    if let Some(name) = input.name {
        customer.name = name.trim().to_string();
    }
    if let Some(phone) = input.phone {
        customer.phone = phone.trim().to_string();
    }
    if let Some(status) = input.status {
        customer.status = status;
    }
    customer.address = input.address.or(customer.address);
    customer.city = input.city.or(customer.city);
    customer.state = input.state.or(customer.state);
    customer.zip_code = input.zip_code.or(customer.zip_code);
    customer.country = input.country.or(customer.country);
    customer.driver_license = input.driver_license.or(customer.driver_license);
    customer.date_of_birth = input.date_of_birth.or(customer.date_of_birth);
    customer.notes = input.notes.or(customer.notes);

    store.put(&customer).await
}

/// Deletes the customer and detaches their bookings, which stay on record.
pub async fn delete(store: &FleetStore, customer_id: &str) -> AppResult<Customer> {
    let customer = store.get::<Customer>(customer_id).await?;
    for mut booking in store.list_where::<Booking>("customer_id", customer_id).await? {
        booking.customer_id = None;
        store.put(&booking).await?;
    }
    store.delete::<Customer>(&customer.id).await
}

/// Resolves the customer behind a booking request by e-mail, creating one on
/// first contact. Blacklisted customers are refused.
pub async fn link_or_create(
    store: &FleetStore,
    name: &str,
    email: &str,
    phone: &str,
) -> AppResult<Customer> {
    if let Some(existing) = find_by_email(store, email).await? {
        if existing.status == CustomerStatus::Blacklisted {
            tracing::warn!(customer_id = %existing.id, "Booking refused for blacklisted customer");
            return Err(AppError::Forbidden(
                "This customer is not allowed to make bookings.".to_string(),
            ));
        }
        return Ok(existing);
    }

    let customer = create(
        store,
        CustomerInput {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            driver_license: None,
            date_of_birth: None,
            status: CustomerStatus::Active,
            notes: None,
        },
    )
    .await?;

    notifications::emit(
        store,
        NewNotification {
            kind: NotificationKind::CustomerUpdate,
            title: "New Customer".to_string(),
            message: format!("{} registered through a booking request.", customer.name),
            priority: NotificationPriority::Low,
            link_to: Some(format!("/customers/{}", customer.id)),
            related_id: Some(customer.id.clone()),
        },
    )
    .await?;
    Ok(customer)
}
