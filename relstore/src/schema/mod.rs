//! Record type schema
//!
//! This module contains the type descriptors the store works against:
//! - `TypeRegistry`: two-phase builder (declare tags, then define fields)
//! - `Schema`: frozen arena of `TypeDef`s addressed by `TypeTag`
//! - `FieldDef` / `Field`: unresolved and resolved field declarations
//! - `KeyCodec`: how key-nested fields read and write raw keys

mod field;
mod key;
mod registry;

pub use field::{AccessMode, FieldDef, KeyFieldRef, TypeRef};
pub use key::{KeyCodec, ObjectKey, PlainKey};
pub use registry::TypeRegistry;

use crate::ids::{FieldId, RelationKind, TypeTag};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Relation half of a resolved relation-valued field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Type of the records on the far side of the edge
    pub target: TypeTag,
    /// Kind of the forward edge `holder -> target`
    pub kind: RelationKind,
    /// Kind of the edge `target -> holder`, if maintained
    pub back: Option<RelationKind>,
    pub many: bool,
}

/// Resolved key-nested field
#[derive(Debug, Clone)]
pub struct KeyRelation {
    pub key_field: FieldId,
    /// Raw attribute holding the key(s)
    pub origin: String,
    pub codec: Arc<dyn KeyCodec>,
    pub relation: Relation,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Plain,
    Nested(Relation),
    Relationship(Relation),
    KeyNested(KeyRelation),
}

impl FieldKind {
    /// Relation described by this field, if it is relation-valued
    pub fn relation(&self) -> Option<&Relation> {
        match self {
            FieldKind::Plain => None,
            FieldKind::Nested(rel) | FieldKind::Relationship(rel) => Some(rel),
            FieldKind::KeyNested(key) => Some(&key.relation),
        }
    }
}

/// Resolved field of a record type
#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub key: bool,
    pub mode: AccessMode,
    pub default: Option<Value>,
    pub kind: FieldKind,
}

/// Descriptor of one record type
#[derive(Debug, Clone)]
pub struct TypeDef {
    tag: TypeTag,
    name: String,
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    key_fields: Vec<FieldId>,
}

impl TypeDef {
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&slot| &self.fields[slot])
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.field(name).map(|field| field.id)
    }

    /// Fields registered in the identity index, in declaration order
    pub fn key_fields(&self) -> &[FieldId] {
        &self.key_fields
    }
}

/// Frozen set of record types
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: Vec<TypeDef>,
    names: HashMap<String, TypeTag>,
}

impl Schema {
    pub(crate) fn new(types: Vec<TypeDef>) -> Self {
        let names = types.iter().map(|def| (def.name.clone(), def.tag)).collect();
        Self { types, names }
    }

    pub fn get(&self, tag: TypeTag) -> Option<&TypeDef> {
        self.types.get(tag.index())
    }

    pub fn by_name(&self, name: &str) -> Option<&TypeDef> {
        self.tag(name).and_then(|tag| self.get(tag))
    }

    pub fn tag(&self, name: &str) -> Option<TypeTag> {
        self.names.get(name).copied()
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.get(id.owner)
            .and_then(|def| def.fields.get(id.slot as usize))
    }

    /// Look up a field by type and field name
    pub fn field_id(&self, ty: &str, field: &str) -> Option<FieldId> {
        self.by_name(ty).and_then(|def| def.field_id(field))
    }

    pub fn type_name(&self, tag: TypeTag) -> &str {
        self.get(tag).map(TypeDef::name).unwrap_or("?")
    }

    /// Human-readable `Type.field` label
    pub fn field_label(&self, id: FieldId) -> String {
        match self.field(id) {
            Some(field) => format!("{}.{}", self.type_name(id.owner), field.name),
            None => format!("{}.#{}", self.type_name(id.owner), id.slot),
        }
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

pub(crate) fn type_def(tag: TypeTag, name: String, fields: Vec<Field>) -> TypeDef {
    let by_name = fields
        .iter()
        .enumerate()
        .map(|(slot, field)| (field.name.clone(), slot))
        .collect();
    let key_fields = fields
        .iter()
        .filter(|field| field.key)
        .map(|field| field.id)
        .collect();
    TypeDef {
        tag,
        name,
        fields,
        by_name,
        key_fields,
    }
}
