//! Key codecs
//!
//! A key-nested field stores keys in the holder's raw data. The codec decides
//! how a key is read from that raw value and how it is written back when the
//! relation is reassigned.

use crate::error::StoreError;
use crate::ids::KeyValue;
use serde_json::{Map, Value};
use std::fmt;

/// Conversion between raw key data and `KeyValue`
pub trait KeyCodec: fmt::Debug + Send + Sync {
    fn decode(&self, raw: &Value) -> Result<KeyValue, StoreError>;

    fn encode(&self, key: &KeyValue) -> Value;
}

/// The raw value is the key itself, e.g. `"entity_id": 123`
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainKey;

impl KeyCodec for PlainKey {
    fn decode(&self, raw: &Value) -> Result<KeyValue, StoreError> {
        KeyValue::from_json(raw)
            .ok_or_else(|| StoreError::invalid_key(format!("{} cannot be used as a key", raw)))
    }

    fn encode(&self, key: &KeyValue) -> Value {
        key.to_json()
    }
}

/// The key is one attribute of a raw object, e.g. `"entity_id": {"id": 123}`
#[derive(Debug, Clone)]
pub struct ObjectKey {
    attribute: String,
}

impl ObjectKey {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl KeyCodec for ObjectKey {
    fn decode(&self, raw: &Value) -> Result<KeyValue, StoreError> {
        let value = raw.get(&self.attribute).ok_or_else(|| {
            StoreError::invalid_key(format!("{} has no attribute '{}'", raw, self.attribute))
        })?;
        PlainKey.decode(value)
    }

    fn encode(&self, key: &KeyValue) -> Value {
        let mut object = Map::new();
        object.insert(self.attribute.clone(), key.to_json());
        Value::Object(object)
    }
}
