//! Identifiers and key values
//!
//! Everything the store hands out is a small `Copy` handle into one of its
//! arenas: records are addressed by `RecordId`, record types by `TypeTag`
//! and fields by `FieldId`. `KeyValue` is the hashable subset of JSON that
//! can be used as an identity key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Handle of a record in the store's record arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub(crate) u32);

impl RecordId {
    /// Position of the record in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable discriminant of a record type, assigned at declaration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(pub(crate) u32);

impl TypeTag {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A field of a record type: owning type plus declaration slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub owner: TypeTag,
    pub slot: u32,
}

/// Semantic classification of a relation edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Parent,
    Child,
    Related,
    /// Application-defined kind
    Custom(u16),
    /// Forward edge of the key-nested field in this slot of the holder type.
    /// Assigned by the schema, one per field.
    Reference(u32),
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Parent => write!(f, "parent"),
            RelationKind::Child => write!(f, "child"),
            RelationKind::Related => write!(f, "related"),
            RelationKind::Custom(n) => write!(f, "custom({})", n),
            RelationKind::Reference(slot) => write!(f, "reference({})", slot),
        }
    }
}

/// Value of a key field
///
/// Integers that fit in `i64` are always stored as `Int`, so a key read from
/// JSON and a key built from a Rust integer compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
    List(Vec<KeyValue>),
}

impl KeyValue {
    /// Convert a raw JSON value into a key
    ///
    /// Returns `None` for `null`, floats and objects, which cannot act as keys.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(KeyValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(KeyValue::Int(i))
                } else {
                    n.as_u64().map(KeyValue::UInt)
                }
            }
            Value::String(s) => Some(KeyValue::Str(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(KeyValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(KeyValue::List),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Convert back into the JSON representation
    pub fn to_json(&self) -> Value {
        match self {
            KeyValue::Bool(b) => Value::Bool(*b),
            KeyValue::Int(i) => Value::from(*i),
            KeyValue::UInt(u) => Value::from(*u),
            KeyValue::Str(s) => Value::String(s.clone()),
            KeyValue::List(items) => Value::Array(items.iter().map(KeyValue::to_json).collect()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(b) => write!(f, "{}", b),
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::UInt(u) => write!(f, "{}", u),
            KeyValue::Str(s) => write!(f, "{:?}", s),
            KeyValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(value as i64)
    }
}

impl From<u64> for KeyValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => KeyValue::Int(i),
            Err(_) => KeyValue::UInt(value),
        }
    }
}

impl From<bool> for KeyValue {
    fn from(value: bool) -> Self {
        KeyValue::Bool(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Str(value)
    }
}

/// Placeholder for a record that is known only by key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingRef {
    pub field: FieldId,
    pub key: KeyValue,
}

impl PendingRef {
    pub fn new(field: FieldId, key: KeyValue) -> Self {
        Self { field, key }
    }

    /// Type of the record this placeholder will resolve to
    pub fn target_type(&self) -> TypeTag {
        self.field.owner
    }
}

/// Endpoint of a relation edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Record(RecordId),
    Pending(PendingRef),
}

impl Node {
    pub fn as_record(&self) -> Option<RecordId> {
        match self {
            Node::Record(id) => Some(*id),
            Node::Pending(_) => None,
        }
    }

    pub fn as_pending(&self) -> Option<&PendingRef> {
        match self {
            Node::Record(_) => None,
            Node::Pending(pending) => Some(pending),
        }
    }
}

impl From<RecordId> for Node {
    fn from(id: RecordId) -> Self {
        Node::Record(id)
    }
}

impl From<PendingRef> for Node {
    fn from(pending: PendingRef) -> Self {
        Node::Pending(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_from_json() {
        assert_eq!(KeyValue::from_json(&json!(123)), Some(KeyValue::Int(123)));
        assert_eq!(
            KeyValue::from_json(&json!("abc")),
            Some(KeyValue::Str("abc".to_string()))
        );
        assert_eq!(
            KeyValue::from_json(&json!(u64::MAX)),
            Some(KeyValue::UInt(u64::MAX))
        );
        assert_eq!(
            KeyValue::from_json(&json!([1, "a"])),
            Some(KeyValue::List(vec![
                KeyValue::Int(1),
                KeyValue::Str("a".to_string())
            ]))
        );
    }

    #[test]
    fn test_invalid_keys() {
        assert_eq!(KeyValue::from_json(&json!(null)), None);
        assert_eq!(KeyValue::from_json(&json!(1.5)), None);
        assert_eq!(KeyValue::from_json(&json!({"id": 1})), None);
        assert_eq!(KeyValue::from_json(&json!([1, null])), None);
    }

    #[test]
    fn test_rust_and_json_keys_agree() {
        assert_eq!(KeyValue::from(123u64), KeyValue::from_json(&json!(123)).unwrap());
        assert_eq!(KeyValue::from(7i32), KeyValue::Int(7));
        assert_eq!(KeyValue::from(u64::MAX), KeyValue::UInt(u64::MAX));
    }

    #[test]
    fn test_relation_kind_serde() {
        assert_eq!(serde_json::to_value(RelationKind::Parent).unwrap(), json!("parent"));
        assert_eq!(
            serde_json::from_value::<RelationKind>(json!({"custom": 4})).unwrap(),
            RelationKind::Custom(4)
        );
        assert_eq!(serde_json::to_value(RecordId(7)).unwrap(), json!(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordId(3).to_string(), "#3");
        assert_eq!(RelationKind::Custom(9).to_string(), "custom(9)");
        assert_eq!(RelationKind::Reference(2).to_string(), "reference(2)");
        assert_eq!(
            KeyValue::List(vec![KeyValue::Int(1), KeyValue::from("x")]).to_string(),
            "[1, \"x\"]"
        );
    }
}
