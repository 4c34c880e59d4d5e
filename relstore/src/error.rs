//! Error types for the store and the schema registry.

use crate::ids::{KeyValue, RecordId, RelationKind};
use thiserror::Error;

/// Errors raised by store, relation and record operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A different record is already registered under this identity key.
    #[error("{field}={key} already in store (bound to {existing})")]
    DuplicateKey {
        field: String,
        key: KeyValue,
        existing: RecordId,
    },

    /// The target is already present in the relation bucket.
    #[error("relation {kind} already exists between {from} and {to}")]
    DuplicateRelation {
        from: String,
        to: String,
        kind: RelationKind,
    },

    /// An expected relation, key or record is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value does not have the shape or type the field requires.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A raw value cannot be used as a key.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The record handle does not belong to this store.
    #[error("unknown record {0}")]
    UnknownRecord(RecordId),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{ty}' has no field '{field}'")]
    UnknownField { ty: String, field: String },

    #[error("field {0} is not a key field")]
    NotAKeyField(String),

    /// The field's access mode forbids the operation.
    #[error("field {field} does not allow {access}")]
    AccessDenied { field: String, access: &'static str },

    /// The operation has no meaning for relation edges.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Key fields are fixed once the record is indexed.
    #[error("key field {0} cannot be changed after registration")]
    KeyFieldImmutable(String),

    #[error("cycle detected while dumping {0}")]
    DumpCycle(RecordId),
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a type-mismatch error.
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    /// Create an invalid-key error.
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }
}

/// Errors raised while declaring and building a schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("type '{0}' already declared")]
    DuplicateType(String),

    #[error("type '{ty}' declares field '{field}' twice")]
    DuplicateField { ty: String, field: String },

    #[error("type '{0}' is not declared")]
    UnknownType(String),

    #[error("type '{0}' is already defined")]
    AlreadyDefined(String),

    /// Declared but never given a field list.
    #[error("type '{0}' was declared but never defined")]
    Undefined(String),

    #[error("{ty}.{field} is not a key field")]
    NotAKeyField { ty: String, field: String },

    #[error("type '{ty}' has no field '{field}'")]
    UnknownField { ty: String, field: String },

    /// Two nested fields of one type target the same type with the same kind.
    #[error("{ty}.{first} and {ty}.{second} share a relation bucket")]
    SharedBucket {
        ty: String,
        first: String,
        second: String,
    },
}
