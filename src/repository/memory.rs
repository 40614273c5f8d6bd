use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Process-local table store. Rows keep insertion order; an upsert of an
/// existing id replaces the row where it sits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Vec<Value>>>>,
}

impl MemoryStore {
    pub async fn list(&self, table: &'static str, filter: Option<(&str, &str)>) -> Vec<Value> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Vec::new();
        };
        rows.iter()
            .filter(|row| match filter {
                Some((field, wanted)) => text_field(row, field).as_deref() == Some(wanted),
                None => true,
            })
            .cloned()
            .collect()
    }

    pub async fn get(&self, table: &'static str, id: &str) -> Option<Value> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)))
            .cloned()
    }

    pub async fn upsert(&self, table: &'static str, id: &str, payload: Map<String, Value>) -> Value {
        let row = Value::Object(payload);
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        match rows.iter_mut().find(|existing| row_id(existing) == Some(id)) {
            Some(existing) => *existing = row.clone(),
            None => rows.push(row.clone()),
        }
        row
    }

    pub async fn remove(&self, table: &'static str, id: &str) -> Option<Value> {
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table)?;
        let index = rows.iter().position(|row| row_id(row) == Some(id))?;
        Some(rows.remove(index))
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.as_object()
        .and_then(|obj| obj.get("id"))
        .and_then(Value::as_str)
}

fn text_field(row: &Value, field: &str) -> Option<String> {
    match row.as_object()?.get(field)? {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::MemoryStore;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let store = MemoryStore::default();
        store
            .upsert("cars", "c1", payload(json!({"id": "c1"})))
            .await;
        assert_eq!(store.list("cars", None).await.len(), 1);
        assert!(store.list("bookings", None).await.is_empty());
        assert!(store.get("bookings", "c1").await.is_none());
    }

    #[tokio::test]
    async fn filter_compares_scalars_as_text() {
        let store = MemoryStore::default();
        store
            .upsert("cars", "c1", payload(json!({"id": "c1", "available": true})))
            .await;
        store
            .upsert("cars", "c2", payload(json!({"id": "c2", "available": false})))
            .await;

        let listed = store.list("cars", Some(("available", "true"))).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], "c1");
    }

    #[tokio::test]
    async fn remove_reports_missing_rows() {
        let store = MemoryStore::default();
        assert!(store.remove("cars", "c1").await.is_none());
        store
            .upsert("cars", "c1", payload(json!({"id": "c1"})))
            .await;
        assert!(store.remove("cars", "c1").await.is_some());
        assert!(store.remove("cars", "c1").await.is_none());
    }
}
