//! Record model
//!
//! Field-driven access to records held by a [`Store`]. Each record type's
//! field table decides how an attribute is read and written:
//! - plain fields read and write the record's raw data
//! - nested and relationship fields read relation buckets
//! - key-nested fields read the buckets filled by key relations
//!
//! Writes to relation fields go through the mutation protocol in `access`,
//! loading and dumping JSON lives in `loader` and `dump`.

mod access;
mod dump;
mod loader;

pub use access::RelationList;
pub use dump::DumpOptions;

use crate::error::StoreError;
use crate::ids::{Node, RecordId};
use crate::schema::{AccessMode, Field, FieldKind};
use crate::store::Store;
use serde_json::Value;

/// Value of a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Raw attribute of a plain field
    Value(Value),
    /// Single-valued relation
    One(Option<RecordId>),
    /// Multi-valued relation, in insertion order
    Many(Vec<RecordId>),
}

impl FieldValue {
    fn shape(&self) -> &'static str {
        match self {
            FieldValue::Value(_) => "a plain value",
            FieldValue::One(_) => "a single record",
            FieldValue::Many(_) => "a list of records",
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<RecordId> for FieldValue {
    fn from(id: RecordId) -> Self {
        FieldValue::One(Some(id))
    }
}

impl From<Option<RecordId>> for FieldValue {
    fn from(id: Option<RecordId>) -> Self {
        FieldValue::One(id)
    }
}

impl From<Vec<RecordId>> for FieldValue {
    fn from(ids: Vec<RecordId>) -> Self {
        FieldValue::Many(ids)
    }
}

impl Store {
    /// Resolved field `name` of the record's type
    pub(crate) fn lookup_field(&self, record: RecordId, name: &str) -> Result<Field, StoreError> {
        let ty = self.type_of(record)?;
        let def = self
            .schema()
            .get(ty)
            .ok_or_else(|| StoreError::UnknownType(format!("{:?}", ty)))?;

        def.field(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownField {
                ty: def.name().to_string(),
                field: name.to_string(),
            })
    }

    pub(crate) fn check_access(
        &self,
        field: &Field,
        mode: AccessMode,
        access: &'static str,
    ) -> Result<(), StoreError> {
        if field.mode.contains(mode) {
            Ok(())
        } else {
            Err(StoreError::AccessDenied {
                field: self.field_label(field.id),
                access,
            })
        }
    }

    /// Read a field of a record
    ///
    /// Plain fields read as `FieldValue::Value` (`null` when absent),
    /// relation fields as `One` or `Many` depending on their arity.
    pub fn field(&self, record: RecordId, name: &str) -> Result<FieldValue, StoreError> {
        let field = self.lookup_field(record, name)?;
        self.check_access(&field, AccessMode::GET, "get")?;
        self.read_field(record, &field)
    }

    pub(crate) fn read_field(&self, record: RecordId, field: &Field) -> Result<FieldValue, StoreError> {
        match &field.kind {
            FieldKind::Plain => {
                let value = self
                    .record(record)?
                    .get(&field.name)
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok(FieldValue::Value(value))
            }
            FieldKind::Nested(rel) | FieldKind::Relationship(rel) => {
                if rel.many {
                    Ok(FieldValue::Many(self.get_related(record, rel.target, rel.kind)))
                } else {
                    Ok(FieldValue::One(
                        self.get_one_related(record, rel.target, rel.kind),
                    ))
                }
            }
            FieldKind::KeyNested(key) => {
                let rel = &key.relation;
                if !rel.many {
                    return Ok(FieldValue::One(
                        self.get_one_related(record, rel.target, rel.kind),
                    ));
                }

                let nodes = self
                    .graph()
                    .query_many(&Node::Record(record), rel.target, rel.kind);
                if let Some(pending) = nodes.iter().find_map(Node::as_pending) {
                    return Err(StoreError::not_found(format!(
                        "{}={} referenced by {}",
                        self.field_label(pending.field),
                        pending.key,
                        self.field_label(field.id)
                    )));
                }
                Ok(FieldValue::Many(
                    nodes.iter().filter_map(Node::as_record).collect(),
                ))
            }
        }
    }

    /// Read a plain field
    pub fn value(&self, record: RecordId, name: &str) -> Result<Value, StoreError> {
        match self.field(record, name)? {
            FieldValue::Value(value) => Ok(value),
            other => Err(self.shape_mismatch(record, name, "a plain value", &other)),
        }
    }

    /// Read a single-valued relation field
    pub fn one(&self, record: RecordId, name: &str) -> Result<Option<RecordId>, StoreError> {
        match self.field(record, name)? {
            FieldValue::One(id) => Ok(id),
            other => Err(self.shape_mismatch(record, name, "a single record", &other)),
        }
    }

    /// Read a multi-valued relation field
    pub fn many(&self, record: RecordId, name: &str) -> Result<Vec<RecordId>, StoreError> {
        match self.field(record, name)? {
            FieldValue::Many(ids) => Ok(ids),
            other => Err(self.shape_mismatch(record, name, "a list of records", &other)),
        }
    }

    fn shape_mismatch(
        &self,
        record: RecordId,
        name: &str,
        expected: &str,
        found: &FieldValue,
    ) -> StoreError {
        let ty = self
            .type_of(record)
            .map(|ty| self.schema().type_name(ty).to_string())
            .unwrap_or_default();
        StoreError::type_mismatch(format!(
            "{}.{} holds {}, not {}",
            ty,
            name,
            found.shape(),
            expected
        ))
    }
}
