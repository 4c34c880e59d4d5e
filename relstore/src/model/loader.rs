//! JSON loader
//!
//! Builds records from raw JSON. The record is added to the store (keys
//! registered, pending relations resolved) before its relation fields are
//! loaded, so nested children may refer back to it by key.

use crate::error::StoreError;
use crate::ids::{KeyValue, RecordId, TypeTag};
use crate::schema::{AccessMode, FieldKind, KeyRelation, Relation};
use crate::store::Store;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

impl Store {
    /// Load a record of type `type_name` from a JSON object
    pub fn load(&mut self, type_name: &str, data: Value) -> Result<RecordId, StoreError> {
        let tag = self
            .schema()
            .tag(type_name)
            .ok_or_else(|| StoreError::UnknownType(type_name.to_string()))?;
        self.load_tag(tag, data)
    }

    /// Load a record of type `ty` from a JSON object
    pub fn load_tag(&mut self, ty: TypeTag, data: Value) -> Result<RecordId, StoreError> {
        let schema = Arc::clone(self.schema());
        let def = schema
            .get(ty)
            .ok_or_else(|| StoreError::UnknownType(format!("{:?}", ty)))?;

        let mut data = match data {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::type_mismatch(format!(
                    "{} must be loaded from an object, got {}",
                    def.name(),
                    other
                )))
            }
        };

        // Defaults and detached nested data, before the record exists
        let mut nested = Vec::new();
        for field in def.fields() {
            if !field.mode.contains(AccessMode::LOAD) {
                continue;
            }
            match &field.kind {
                FieldKind::Plain => {
                    if let Some(default) = &field.default {
                        if !data.contains_key(&field.name) {
                            data.insert(field.name.clone(), default.clone());
                        }
                    }
                }
                FieldKind::Nested(rel) => {
                    if let Some(raw) = data.remove(&field.name) {
                        nested.push((field.name.as_str(), *rel, raw));
                    }
                }
                FieldKind::Relationship(_) | FieldKind::KeyNested(_) => {}
            }
        }

        let key_raw: Vec<(&KeyRelation, Value)> = def
            .fields()
            .iter()
            .filter(|field| field.mode.contains(AccessMode::LOAD))
            .filter_map(|field| match &field.kind {
                FieldKind::KeyNested(key) => data.get(&key.origin).map(|raw| (key, raw.clone())),
                _ => None,
            })
            .collect();

        let id = self.add(ty, data)?;

        for (name, rel, raw) in nested {
            self.load_nested(id, name, &rel, raw)?;
        }
        for (key, raw) in key_raw {
            self.load_key_nested(id, key, &raw)?;
        }

        trace!(record = %id, ty = def.name(), "Record loaded");
        Ok(id)
    }

    /// Load every record of a document shaped `{type_name: [record, ...]}`
    ///
    /// A single object in place of the array is loaded as one record. Types
    /// are loaded in the map's iteration order; deferred key relations make
    /// the result independent of it.
    pub fn load_document(&mut self, document: Value) -> Result<Vec<RecordId>, StoreError> {
        let Value::Object(types) = document else {
            return Err(StoreError::type_mismatch(
                "a document must be an object of type name to records",
            ));
        };

        let mut loaded = Vec::new();
        for (type_name, records) in types {
            let before = loaded.len();
            match records {
                Value::Array(items) => {
                    for item in items {
                        loaded.push(self.load(&type_name, item)?);
                    }
                }
                other => loaded.push(self.load(&type_name, other)?),
            }
            debug!(ty = %type_name, records = loaded.len() - before, "Loaded records");
        }

        debug!(
            records = loaded.len(),
            unresolved = self.unresolved_count(),
            "Document loaded"
        );
        Ok(loaded)
    }

    fn load_nested(
        &mut self,
        parent: RecordId,
        name: &str,
        rel: &Relation,
        raw: Value,
    ) -> Result<(), StoreError> {
        match raw {
            Value::Null => Ok(()),
            Value::Array(items) if rel.many => {
                for item in items {
                    self.load_child(parent, rel, item)?;
                }
                Ok(())
            }
            other if rel.many => Err(StoreError::type_mismatch(format!(
                "{} expects an array of records, got {}",
                name, other
            ))),
            other => self.load_child(parent, rel, other),
        }
    }

    fn load_child(&mut self, parent: RecordId, rel: &Relation, raw: Value) -> Result<(), StoreError> {
        let child = self.load_tag(rel.target, raw)?;
        self.make_relation(parent, child, rel.kind)?;
        if let Some(back) = rel.back {
            self.make_relation(child, parent, back)?;
        }
        Ok(())
    }

    fn load_key_nested(
        &mut self,
        holder: RecordId,
        key: &KeyRelation,
        raw: &Value,
    ) -> Result<(), StoreError> {
        let keys: Vec<KeyValue> = match raw {
            Value::Null => return Ok(()),
            Value::Array(items) if key.relation.many => items
                .iter()
                .map(|item| key.codec.decode(item))
                .collect::<Result<_, _>>()?,
            other if key.relation.many => {
                return Err(StoreError::type_mismatch(format!(
                    "{} expects an array of keys, got {}",
                    key.origin, other
                )))
            }
            other => vec![key.codec.decode(other)?],
        };

        for value in keys {
            self.make_key_relation(key.key_field, value.clone(), key.relation.kind, holder)?;
            if let Some(back) = key.relation.back {
                self.make_reverse_key_relation(key.key_field, value, back, holder)?;
            }
        }
        Ok(())
    }
}
