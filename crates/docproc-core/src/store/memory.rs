//! In-memory document store for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::{Map, Value};

use super::{DocumentStore, ItemKey, prepare_update};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<ItemKey, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn merge(&self, key: &ItemKey, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let item = items.entry(key.clone()).or_default();
        for (field, value) in prepare_update(fields) {
            item.insert(field, value);
        }
        Ok(())
    }

    fn get(&self, key: &ItemKey) -> Result<Value, StoreError> {
        let items = self
            .items
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        items
            .get(key)
            .map(|item| Value::Object(item.clone()))
            .ok_or(StoreError::NotFound)
    }
}
