//! Field definitions
//!
//! A `FieldDef` is the unresolved declaration of one attribute of a record
//! type. Targets may name types that are declared later; they are resolved
//! when the registry builds the schema.

use super::key::{KeyCodec, PlainKey};
use crate::ids::{RelationKind, TypeTag};
use bitflags::bitflags;
use serde_json::Value;
use std::sync::Arc;

bitflags! {
    /// Operations a field takes part in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessMode: u8 {
        /// Readable through the record accessors
        const GET = 1;
        /// Writable through the record accessors
        const SET = 1 << 1;
        /// Populated by the loader
        const LOAD = 1 << 2;
        /// Written by the dumper
        const DUMP = 1 << 3;

        const GET_LOAD = Self::GET.bits() | Self::LOAD.bits();
        const GET_DUMP = Self::GET.bits() | Self::DUMP.bits();
        const SET_LOAD = Self::SET.bits() | Self::LOAD.bits();
        const GET_SET_LOAD = Self::GET.bits() | Self::SET.bits() | Self::LOAD.bits();
        const GET_LOAD_DUMP = Self::GET.bits() | Self::LOAD.bits() | Self::DUMP.bits();

        const ALL = Self::GET.bits() | Self::SET.bits() | Self::LOAD.bits() | Self::DUMP.bits();
    }
}

/// Reference to a record type, by tag or by (possibly not yet declared) name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Tag(TypeTag),
    Name(String),
}

impl From<TypeTag> for TypeRef {
    fn from(tag: TypeTag) -> Self {
        TypeRef::Tag(tag)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Name(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::Name(name)
    }
}

/// Reference to a key field of another type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFieldRef {
    pub ty: TypeRef,
    pub field: String,
}

impl KeyFieldRef {
    pub fn new(ty: impl Into<TypeRef>, field: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            field: field.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FieldSpec {
    Plain,
    Nested {
        target: TypeRef,
        many: bool,
        relation: RelationKind,
        back_relation: Option<RelationKind>,
    },
    Relationship {
        target: TypeRef,
        relation: RelationKind,
        many: bool,
    },
    KeyNested {
        key_field: KeyFieldRef,
        origin: String,
        many: bool,
        back_relation: Option<RelationKind>,
        codec: Arc<dyn KeyCodec>,
    },
}

/// Declaration of one attribute of a record type
///
/// # Example
///
/// ```
/// use relstore::schema::{FieldDef, KeyFieldRef};
/// use relstore::RelationKind;
///
/// let fields = vec![
///     FieldDef::key("id"),
///     FieldDef::plain("name").with_default("Bob"),
///     FieldDef::nested("items", "Item").many().back_relation(RelationKind::Child),
///     FieldDef::relationship("parent", "Item", RelationKind::Child),
///     FieldDef::key_nested("owner", KeyFieldRef::new("User", "id"), "owner_id"),
/// ];
/// assert_eq!(fields.len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) key: bool,
    pub(crate) mode: AccessMode,
    pub(crate) default: Option<Value>,
    pub(crate) spec: FieldSpec,
}

impl FieldDef {
    /// A raw attribute
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: false,
            mode: AccessMode::ALL,
            default: None,
            spec: FieldSpec::Plain,
        }
    }

    /// A raw attribute registered in the identity index
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            key: true,
            ..Self::plain(name)
        }
    }

    /// Child records built from the attribute's nested data
    ///
    /// Links parent to child with `RelationKind::Parent` unless changed with
    /// [`relation`](Self::relation).
    pub fn nested(name: impl Into<String>, target: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            key: false,
            mode: AccessMode::ALL,
            default: None,
            spec: FieldSpec::Nested {
                target: target.into(),
                many: false,
                relation: RelationKind::Parent,
                back_relation: None,
            },
        }
    }

    /// Read-only view of the `(self, target, relation)` bucket
    pub fn relationship(
        name: impl Into<String>,
        target: impl Into<TypeRef>,
        relation: RelationKind,
    ) -> Self {
        Self {
            name: name.into(),
            key: false,
            mode: AccessMode::GET,
            default: None,
            spec: FieldSpec::Relationship {
                target: target.into(),
                relation,
                many: false,
            },
        }
    }

    /// Records referenced by key through the raw attribute `origin`
    pub fn key_nested(
        name: impl Into<String>,
        key_field: KeyFieldRef,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key: false,
            mode: AccessMode::GET_SET_LOAD,
            default: None,
            spec: FieldSpec::KeyNested {
                key_field,
                origin: origin.into(),
                many: false,
                back_relation: None,
                codec: Arc::new(PlainKey),
            },
        }
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Value applied on load when the attribute is absent (plain fields)
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Make a relation field multi-valued. Ignored for plain fields.
    pub fn many(mut self) -> Self {
        match &mut self.spec {
            FieldSpec::Plain => {}
            FieldSpec::Nested { many, .. }
            | FieldSpec::Relationship { many, .. }
            | FieldSpec::KeyNested { many, .. } => *many = true,
        }
        self
    }

    /// Kind of the forward edge
    ///
    /// Ignored for plain fields, and for key-nested fields, whose forward
    /// edges get a kind of their own when the schema is built.
    pub fn relation(mut self, kind: RelationKind) -> Self {
        match &mut self.spec {
            FieldSpec::Plain | FieldSpec::KeyNested { .. } => {}
            FieldSpec::Nested { relation, .. } | FieldSpec::Relationship { relation, .. } => {
                *relation = kind
            }
        }
        self
    }

    /// Kind of the edge maintained from the target back to the holder
    ///
    /// Only nested and key-nested fields maintain back-relations.
    pub fn back_relation(mut self, kind: RelationKind) -> Self {
        match &mut self.spec {
            FieldSpec::Nested { back_relation, .. } | FieldSpec::KeyNested { back_relation, .. } => {
                *back_relation = Some(kind)
            }
            FieldSpec::Plain | FieldSpec::Relationship { .. } => {}
        }
        self
    }

    /// Key codec of a key-nested field
    pub fn codec(mut self, key_codec: impl KeyCodec + 'static) -> Self {
        if let FieldSpec::KeyNested { codec, .. } = &mut self.spec {
            *codec = Arc::new(key_codec);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_key(&self) -> bool {
        self.key
    }
}
