//! Two-phase type registry
//!
//! Types are first declared, which hands out a stable `TypeTag`, and only
//! then defined with their fields. Fields may therefore point at types that
//! are declared later in the batch, or at their own type. `build` resolves
//! every name and freezes the result into a `Schema`.

use super::field::{FieldDef, FieldSpec, KeyFieldRef, TypeRef};
use super::{type_def, Field, FieldKind, KeyRelation, Relation, Schema, TypeDef};
use crate::error::SchemaError;
use crate::ids::{FieldId, RelationKind, TypeTag};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Declared {
    name: String,
    fields: Option<Vec<FieldDef>>,
}

/// Registry mapping type names to tags and field declarations
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    names: HashMap<String, TypeTag>,
    declared: Vec<Declared>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a tag for a type name
    pub fn declare(&mut self, name: impl Into<String>) -> Result<TypeTag, SchemaError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(SchemaError::DuplicateType(name));
        }

        let tag = TypeTag(self.declared.len() as u32);
        self.names.insert(name.clone(), tag);
        self.declared.push(Declared { name, fields: None });
        Ok(tag)
    }

    /// Attach the field list to a declared type
    pub fn define(&mut self, tag: TypeTag, fields: Vec<FieldDef>) -> Result<(), SchemaError> {
        let declared = self
            .declared
            .get_mut(tag.index())
            .ok_or_else(|| SchemaError::UnknownType(format!("{:?}", tag)))?;

        if declared.fields.is_some() {
            return Err(SchemaError::AlreadyDefined(declared.name.clone()));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    ty: declared.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        declared.fields = Some(fields);
        Ok(())
    }

    /// Declare and define in one step
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fields: Vec<FieldDef>,
    ) -> Result<TypeTag, SchemaError> {
        let tag = self.declare(name)?;
        self.define(tag, fields)?;
        Ok(tag)
    }

    pub fn resolve(&self, name: &str) -> Result<TypeTag, SchemaError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Forget every declaration. Tags handed out before are invalid afterwards.
    pub fn clear(&mut self) {
        self.names.clear();
        self.declared.clear();
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Resolve every reference and freeze the registry into a schema
    pub fn build(&self) -> Result<Schema, SchemaError> {
        // Phase 1: every declared type must have a field list
        let mut definitions = Vec::with_capacity(self.declared.len());
        for declared in &self.declared {
            let fields = declared
                .fields
                .as_ref()
                .ok_or_else(|| SchemaError::Undefined(declared.name.clone()))?;
            definitions.push((declared.name.as_str(), fields));
        }

        // Phase 2: resolve targets against the complete set of types
        let mut types: Vec<TypeDef> = Vec::with_capacity(definitions.len());
        for (index, (name, defs)) in definitions.iter().enumerate() {
            let owner = TypeTag(index as u32);
            let mut fields = Vec::with_capacity(defs.len());

            for (slot, def) in defs.iter().enumerate() {
                let kind = self.resolve_kind(slot as u32, &def.spec, &definitions)?;
                fields.push(Field {
                    id: FieldId {
                        owner,
                        slot: slot as u32,
                    },
                    name: def.name.clone(),
                    key: def.key,
                    mode: def.mode,
                    default: def.default.clone(),
                    kind,
                });
            }

            check_shared_buckets(name, &fields)?;
            types.push(type_def(owner, name.to_string(), fields));
        }

        Ok(Schema::new(types))
    }

    fn resolve_kind(
        &self,
        slot: u32,
        spec: &FieldSpec,
        definitions: &[(&str, &Vec<FieldDef>)],
    ) -> Result<FieldKind, SchemaError> {
        let kind = match spec {
            FieldSpec::Plain => FieldKind::Plain,
            FieldSpec::Nested {
                target,
                many,
                relation,
                back_relation,
            } => FieldKind::Nested(Relation {
                target: self.resolve_ref(target)?,
                kind: *relation,
                back: *back_relation,
                many: *many,
            }),
            FieldSpec::Relationship {
                target,
                relation,
                many,
            } => FieldKind::Relationship(Relation {
                target: self.resolve_ref(target)?,
                kind: *relation,
                back: None,
                many: *many,
            }),
            FieldSpec::KeyNested {
                key_field,
                origin,
                many,
                back_relation,
                codec,
            } => {
                let key_field = self.resolve_key_field(key_field, definitions)?;
                FieldKind::KeyNested(KeyRelation {
                    key_field,
                    origin: origin.clone(),
                    codec: codec.clone(),
                    relation: Relation {
                        target: key_field.owner,
                        kind: RelationKind::Reference(slot),
                        back: *back_relation,
                        many: *many,
                    },
                })
            }
        };
        Ok(kind)
    }

    fn resolve_ref(&self, target: &TypeRef) -> Result<TypeTag, SchemaError> {
        match target {
            TypeRef::Tag(tag) if tag.index() < self.declared.len() => Ok(*tag),
            TypeRef::Tag(tag) => Err(SchemaError::UnknownType(format!("{:?}", tag))),
            TypeRef::Name(name) => self.resolve(name),
        }
    }

    fn resolve_key_field(
        &self,
        key_field: &KeyFieldRef,
        definitions: &[(&str, &Vec<FieldDef>)],
    ) -> Result<FieldId, SchemaError> {
        let owner = self.resolve_ref(&key_field.ty)?;
        let (ty, defs) = definitions[owner.index()];

        let slot = defs
            .iter()
            .position(|def| def.name == key_field.field)
            .ok_or_else(|| SchemaError::UnknownField {
                ty: ty.to_string(),
                field: key_field.field.clone(),
            })?;

        if !defs[slot].key {
            return Err(SchemaError::NotAKeyField {
                ty: ty.to_string(),
                field: key_field.field.clone(),
            });
        }

        Ok(FieldId {
            owner,
            slot: slot as u32,
        })
    }
}

/// Two nested fields of one type writing the same `(target, kind)` bucket
/// would read each other's children
fn check_shared_buckets(ty: &str, fields: &[Field]) -> Result<(), SchemaError> {
    let mut owners: HashMap<(TypeTag, RelationKind), &str> = HashMap::new();
    for field in fields {
        let FieldKind::Nested(rel) = &field.kind else {
            continue;
        };
        if let Some(first) = owners.insert((rel.target, rel.kind), field.name.as_str()) {
            return Err(SchemaError::SharedBucket {
                ty: ty.to_string(),
                first: first.to_string(),
                second: field.name.clone(),
            });
        }
    }
    Ok(())
}
