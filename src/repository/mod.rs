pub mod memory;
pub mod table_service;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AppError, AppResult};
use crate::models::Location;
use memory::MemoryStore;

/// A typed row stored in one table of the fleet store.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

#[derive(Clone)]
enum Backend {
    Memory(MemoryStore),
    Postgres(sqlx::PgPool),
}

/// Repository over cars, bookings, locations, customers, notifications and
/// booking history. Every successful write bumps `data_version`, which keys
/// cached reports.
#[derive(Clone)]
pub struct FleetStore {
    backend: Backend,
    version: Arc<AtomicU64>,
    booking_writes: Arc<Mutex<()>>,
}

impl FleetStore {
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::default()),
            version: Arc::new(AtomicU64::new(0)),
            booking_writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            backend: Backend::Postgres(pool),
            version: Arc::new(AtomicU64::new(0)),
            booking_writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Postgres(_) => "postgres",
        }
    }

    pub fn pool(&self) -> Option<&sqlx::PgPool> {
        match &self.backend {
            Backend::Postgres(pool) => Some(pool),
            Backend::Memory(_) => None,
        }
    }

    pub fn data_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Serializes availability check plus booking write within this process.
    pub async fn lock_booking_writes(&self) -> MutexGuard<'_, ()> {
        self.booking_writes.lock().await
    }

    pub async fn list<T: Record>(&self) -> AppResult<Vec<T>> {
        let rows = match &self.backend {
            Backend::Memory(store) => store.list(T::TABLE, None).await,
            Backend::Postgres(pool) => {
                table_service::list_rows(pool, T::TABLE, None, "seq", true).await?
            }
        };
        decode_rows(rows)
    }

    /// Rows whose `field` equals `value` as text.
    pub async fn list_where<T: Record>(&self, field: &str, value: &str) -> AppResult<Vec<T>> {
        let rows = match &self.backend {
            Backend::Memory(store) => store.list(T::TABLE, Some((field, value))).await,
            Backend::Postgres(pool) => {
                let mut filters = Map::new();
                filters.insert(field.to_string(), Value::String(value.to_string()));
                table_service::list_rows(pool, T::TABLE, Some(&filters), "seq", true).await?
            }
        };
        decode_rows(rows)
    }

    pub async fn find<T: Record>(&self, id: &str) -> AppResult<Option<T>> {
        let row = match &self.backend {
            Backend::Memory(store) => store.get(T::TABLE, id).await,
            Backend::Postgres(pool) => table_service::get_row(pool, T::TABLE, id).await?,
        };
        row.map(serde_json::from_value::<T>)
            .transpose()
            .map_err(AppError::from)
    }

    pub async fn get<T: Record>(&self, id: &str) -> AppResult<T> {
        self.find::<T>(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} record not found.", T::TABLE)))
    }

    /// Inserts or replaces the record with the same id.
    pub async fn put<T: Record>(&self, record: &T) -> AppResult<T> {
        let payload = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            _ => {
                return Err(AppError::Internal(format!(
                    "Could not encode {} record.",
                    T::TABLE
                )))
            }
        };

        let stored = match &self.backend {
            Backend::Memory(store) => store.upsert(T::TABLE, record.id(), payload).await,
            Backend::Postgres(pool) => table_service::upsert_row(pool, T::TABLE, &payload).await?,
        };
        self.bump();
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn delete<T: Record>(&self, id: &str) -> AppResult<T> {
        let removed = match &self.backend {
            Backend::Memory(store) => store.remove(T::TABLE, id).await,
            Backend::Postgres(pool) => table_service::delete_row(pool, T::TABLE, id).await?,
        };
        let removed =
            removed.ok_or_else(|| AppError::NotFound(format!("{} record not found.", T::TABLE)))?;
        self.bump();
        Ok(serde_json::from_value(removed)?)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    /// Inserts the three stock branches when no location exists yet. Returns
    /// how many rows were written.
    pub async fn seed_default_locations(&self) -> AppResult<usize> {
        if !self.list::<Location>().await?.is_empty() {
            return Ok(0);
        }
        let defaults = default_locations();
        for location in &defaults {
            self.put(location).await?;
        }
        Ok(defaults.len())
    }
}

fn default_locations() -> Vec<Location> {
    [
        ("loc1", "Downtown Branch", "123 Main Street", "New York", "NY", "10001"),
        ("loc2", "Airport Terminal", "456 Airport Road", "Los Angeles", "CA", "90045"),
        ("loc3", "Central Station", "789 Railway Avenue", "Chicago", "IL", "60606"),
    ]
    .into_iter()
    .map(|(id, name, address, city, state, zip_code)| Location {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        zip_code: zip_code.to_string(),
        country: "USA".to_string(),
    })
    .collect()
}

fn decode_rows<T: Record>(rows: Vec<Value>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value::<T>(row).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::FleetStore;
    use crate::error::AppError;
    use crate::models::Location;

    fn location(id: &str, city: &str) -> Location {
        Location {
            id: id.to_string(),
            name: format!("{city} Branch"),
            address: "1 Main Street".to_string(),
            city: city.to_string(),
            state: "NY".to_string(),
            zip_code: "10001".to_string(),
            country: "USA".to_string(),
        }
    }

    #[tokio::test]
    async fn put_get_list_delete_round() {
        let store = FleetStore::in_memory();
        assert_eq!(store.data_version(), 0);

        store.put(&location("loc1", "New York")).await.unwrap();
        store.put(&location("loc2", "Chicago")).await.unwrap();
        assert_eq!(store.data_version(), 2);

        let fetched = store.get::<Location>("loc2").await.unwrap();
        assert_eq!(fetched.city, "Chicago");

        let ids: Vec<String> = store
            .list::<Location>()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec!["loc1", "loc2"]);

        store.delete::<Location>("loc1").await.unwrap();
        assert!(store.find::<Location>("loc1").await.unwrap().is_none());
        assert_eq!(store.data_version(), 3);
    }

    #[tokio::test]
    async fn put_replaces_in_place() {
        let store = FleetStore::in_memory();
        store.put(&location("loc1", "New York")).await.unwrap();
        store.put(&location("loc2", "Chicago")).await.unwrap();
        store.put(&location("loc1", "Boston")).await.unwrap();

        let rows = store.list::<Location>().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "Boston");
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = FleetStore::in_memory();
        let error = store.get::<Location>("nope").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound(_)));
        let error = store.delete::<Location>("nope").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound(_)));
        assert_eq!(store.data_version(), 0);
    }

    #[tokio::test]
    async fn list_where_matches_text_fields() {
        let store = FleetStore::in_memory();
        store.put(&location("loc1", "New York")).await.unwrap();
        store.put(&location("loc2", "Chicago")).await.unwrap();

        let rows = store.list_where::<Location>("city", "Chicago").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "loc2");
    }

    #[tokio::test]
    async fn seeds_default_locations_once() {
        let store = FleetStore::in_memory();
        assert_eq!(store.seed_default_locations().await.unwrap(), 3);
        assert_eq!(store.seed_default_locations().await.unwrap(), 0);

        let airport = store.get::<Location>("loc2").await.unwrap();
        assert_eq!(airport.city, "Los Angeles");
        assert_eq!(airport.zip_code, "90045");
    }
}
