//! Shared document store: merge-updates and point lookups keyed by
//! document identity, plus the object store the artifacts are fetched from.

mod memory;
mod object;
mod sqlite;

pub use memory::MemoryStore;
pub use object::{FsObjectStore, ObjectStore};
pub use sqlite::SqliteStore;

use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use crate::error::StoreError;

/// Document identity. Which scheme applies depends on the deployment's
/// store schema; callers must use the scheme the item was created with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    /// Single-key schema.
    Single(String),
    /// Composite (primary, secondary) key schema.
    Composite { primary: String, secondary: String },
}

impl ItemKey {
    /// Single-key identity for a document id.
    pub fn document(id: &str) -> Self {
        ItemKey::Single(id.to_string())
    }

    /// The (primary, secondary) parts; single keys have an empty secondary.
    pub fn parts(&self) -> (&str, &str) {
        match self {
            ItemKey::Single(primary) => (primary, ""),
            ItemKey::Composite { primary, secondary } => (primary, secondary),
        }
    }
}

/// Keyed merge-update store.
///
/// `merge` folds the given fields into the stored item (creating it if
/// absent), stamps a fresh `last_updated`, and leaves unmentioned fields
/// untouched. Concurrent merges to the same identity race with
/// last-write-wins per merge; writes to different identities never conflict.
pub trait DocumentStore: Send + Sync {
    fn merge(&self, key: &ItemKey, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Point lookup; fails with [`StoreError::NotFound`] if absent.
    fn get(&self, key: &ItemKey) -> Result<Value, StoreError>;
}

/// Sanitize fields ahead of a write and stamp `last_updated`.
pub(crate) fn prepare_update(fields: Map<String, Value>) -> Map<String, Value> {
    let mut prepared = Map::new();
    for (key, value) in fields {
        if let Some(clean) = sanitize_value(value) {
            prepared.insert(key, clean);
        }
    }
    prepared.insert(
        "last_updated".to_string(),
        json!(chrono::Utc::now().to_rfc3339()),
    );
    prepared
}

/// Recursively drop nulls and empty strings, and convert non-integer
/// numbers to exact decimal strings so no floating-point artifacts reach
/// the store.
pub fn sanitize_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(Value::Number(n))
            } else {
                n.as_f64()
                    .and_then(Decimal::from_f64_retain)
                    .map(|d| Value::String(d.round_dp(4).normalize().to_string()))
            }
        }
        Value::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(sanitize_value).collect(),
        )),
        Value::Object(map) => {
            let mut clean = Map::new();
            for (key, item) in map {
                if let Some(item) = sanitize_value(item) {
                    clean.insert(key, item);
                }
            }
            Some(Value::Object(clean))
        }
        other => Some(other),
    }
}
