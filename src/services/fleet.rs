use crate::error::{AppError, AppResult};
use crate::models::{new_id, Booking, Car, Location};
use crate::repository::FleetStore;
use crate::schemas::{
    CarsQuery, CreateCarInput, LocationInput, UpdateCarInput, UpdateLocationInput,
};
use crate::services::bookings;

pub async fn list_cars(store: &FleetStore, query: &CarsQuery) -> AppResult<Vec<Car>> {
    let mut cars = store.list::<Car>().await?;
    if query.available_only.unwrap_or(false) {
        cars.retain(|car| car.available);
    }
    if let Some(location_id) = query
        .location_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        cars.retain(|car| car.location_id.as_deref() == Some(location_id));
    }
    Ok(cars)
}

async fn ensure_location(store: &FleetStore, location_id: Option<&str>) -> AppResult<()> {
    let Some(location_id) = location_id else {
        return Ok(());
    };
    if store.find::<Location>(location_id).await?.is_none() {
        return Err(AppError::UnprocessableEntity(format!(
            "Location '{location_id}' does not exist."
        )));
    }
    Ok(())
}

pub async fn create_car(store: &FleetStore, input: CreateCarInput) -> AppResult<Car> {
    ensure_location(store, input.location_id.as_deref()).await?;
    let car = Car {
        id: new_id(),
        make: input.make.trim().to_string(),
        model: input.model.trim().to_string(),
        year: input.year,
        transmission: input.transmission,
        fuel_type: input.fuel_type,
        seats: input.seats,
        price_per_day: input.price_per_day,
        available: input.available,
        image: input.image,
        description: input.description,
        location_id: input.location_id,
        popularity: input.popularity,
    };
    let car = store.put(&car).await?;
    tracing::info!(car_id = %car.id, name = %car.display_name(), "Car added");
    Ok(car)
}

pub async fn update_car(store: &FleetStore, car_id: &str, input: UpdateCarInput) -> AppResult<Car> {
    let mut car = store.get::<Car>(car_id).await?;
    if input.location_id.is_some() {
        ensure_location(store, input.location_id.as_deref()).await?;
    }

    if let Some(make) = input.make {
        car.make = make.trim().to_string();
    }
    if let Some(model) = input.model {
        car.model = model.trim().to_string();
    }
    car.year = input.year.unwrap_or(car.year);
    car.transmission = input.transmission.unwrap_or(car.transmission);
    car.fuel_type = input.fuel_type.unwrap_or(car.fuel_type);
    car.seats = input.seats.unwrap_or(car.seats);
    car.price_per_day = input.price_per_day.unwrap_or(car.price_per_day);
    car.available = input.available.unwrap_or(car.available);
    car.image = input.image.or(car.image);
    car.description = input.description.or(car.description);
    car.location_id = input.location_id.or(car.location_id);
    car.popularity = input.popularity.or(car.popularity);

    store.put(&car).await
}

/// Cars with live (non-cancelled) bookings stay; cancelled history goes with
/// the car.
pub async fn delete_car(store: &FleetStore, car_id: &str) -> AppResult<Car> {
    let car = store.get::<Car>(car_id).await?;
    let car_bookings = store.list_where::<Booking>("car_id", car_id).await?;
    if car_bookings
        .iter()
        .any(|booking| booking.status.blocks_availability())
    {
        return Err(AppError::Conflict(
            "Car has active bookings and cannot be deleted.".to_string(),
        ));
    }
    for booking in &car_bookings {
        bookings::delete(store, &booking.id).await?;
    }
    store.delete::<Car>(&car.id).await
}

pub async fn create_location(store: &FleetStore, input: LocationInput) -> AppResult<Location> {
    let location = Location {
        id: new_id(),
        name: input.name.trim().to_string(),
        address: input.address.trim().to_string(),
        city: input.city.trim().to_string(),
        state: input.state.trim().to_string(),
        zip_code: input.zip_code.trim().to_string(),
        country: input.country.trim().to_string(),
    };
    store.put(&location).await
}

pub async fn update_location(
    store: &FleetStore,
    location_id: &str,
    input: UpdateLocationInput,
) -> AppResult<Location> {
    let mut location = store.get::<Location>(location_id).await?;
    location.name = input.name.unwrap_or(location.name);
    location.address = input.address.unwrap_or(location.address);
    location.city = input.city.unwrap_or(location.city);
    location.state = input.state.unwrap_or(location.state);
    location.zip_code = input.zip_code.unwrap_or(location.zip_code);
    location.country = input.country.unwrap_or(location.country);
    store.put(&location).await
}

pub async fn delete_location(store: &FleetStore, location_id: &str) -> AppResult<Location> {
    let location = store.get::<Location>(location_id).await?;
    let in_use = store
        .list_where::<Car>("location_id", location_id)
        .await?
        .len();
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Location is assigned to {in_use} car(s) and cannot be deleted."
        )));
    }
    store.delete::<Location>(&location.id).await
}
