//! JSON dumper

use crate::error::StoreError;
use crate::ids::RecordId;
use crate::schema::{AccessMode, FieldKind, Relation};
use crate::store::Store;
use serde_json::{Map, Value};

/// Options for [`Store::dump`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Leave out fields whose value is `null` (or an absent single relation)
    pub strip_none: bool,
}

impl DumpOptions {
    pub fn strip_none() -> Self {
        Self { strip_none: true }
    }
}

impl Store {
    /// Serialize a record and the records it nests
    ///
    /// Starts from the record's raw data, so attributes without a field are
    /// kept. Fields with DUMP access are written on top: plain fields as
    /// stored, nested and relationship fields as dumped records.
    pub fn dump(&self, record: RecordId, options: DumpOptions) -> Result<Value, StoreError> {
        let mut visiting = Vec::new();
        self.dump_record(record, options, &mut visiting)
            .map(Value::Object)
    }

    fn dump_record(
        &self,
        record: RecordId,
        options: DumpOptions,
        visiting: &mut Vec<RecordId>,
    ) -> Result<Map<String, Value>, StoreError> {
        if visiting.contains(&record) {
            return Err(StoreError::DumpCycle(record));
        }

        let stored = self.record(record)?;
        let def = self
            .schema()
            .get(stored.type_tag())
            .ok_or_else(|| StoreError::UnknownType(format!("{:?}", stored.type_tag())))?;

        visiting.push(record);
        let mut out = stored.data().clone();

        for field in def.fields() {
            if !field.mode.contains(AccessMode::DUMP) {
                continue;
            }

            let value = match &field.kind {
                FieldKind::Plain => stored.get(&field.name).cloned().unwrap_or(Value::Null),
                FieldKind::Nested(rel) | FieldKind::Relationship(rel) => {
                    self.dump_relation(record, rel, options, visiting)?
                }
                // The origin attribute already carries the keys
                FieldKind::KeyNested(_) => continue,
            };

            if options.strip_none && value.is_null() {
                out.remove(&field.name);
            } else {
                out.insert(field.name.clone(), value);
            }
        }

        visiting.pop();
        Ok(out)
    }

    fn dump_relation(
        &self,
        record: RecordId,
        rel: &Relation,
        options: DumpOptions,
        visiting: &mut Vec<RecordId>,
    ) -> Result<Value, StoreError> {
        if rel.many {
            let items = self
                .get_related(record, rel.target, rel.kind)
                .into_iter()
                .map(|id| self.dump_record(id, options, visiting).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(items))
        } else {
            match self.get_one_related(record, rel.target, rel.kind) {
                Some(id) => self.dump_record(id, options, visiting).map(Value::Object),
                None => Ok(Value::Null),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RelationKind;
    use crate::schema::{FieldDef, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> Store {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                "Item",
                vec![
                    FieldDef::key("id"),
                    FieldDef::plain("label"),
                    FieldDef::nested("items", "Item")
                        .many()
                        .back_relation(RelationKind::Child),
                    FieldDef::relationship("parent", "Item", RelationKind::Child),
                ],
            )
            .unwrap();
        Store::new(Arc::new(registry.build().unwrap()))
    }

    #[test]
    fn test_dump_nested_tree() {
        let mut store = store();
        let root = store
            .load(
                "Item",
                json!({"id": 1, "extra": true, "items": [{"id": 2}, {"id": 3, "label": "c"}]}),
            )
            .unwrap();

        let dumped = store.dump(root, DumpOptions::default()).unwrap();
        assert_eq!(
            dumped,
            json!({
                "id": 1,
                "extra": true,
                "label": null,
                "items": [
                    {"id": 2, "label": null, "items": []},
                    {"id": 3, "label": "c", "items": []}
                ]
            })
        );
    }

    #[test]
    fn test_dump_strip_none() {
        let mut store = store();
        let root = store.load("Item", json!({"id": 1})).unwrap();

        let dumped = store.dump(root, DumpOptions::strip_none()).unwrap();
        assert_eq!(dumped, json!({"id": 1, "items": []}));
    }

    #[test]
    fn test_dump_cycle() {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                "Node",
                vec![
                    FieldDef::key("id"),
                    FieldDef::relationship("next", "Node", RelationKind::Related)
                        .with_mode(AccessMode::GET_DUMP),
                ],
            )
            .unwrap();
        let mut store = Store::new(Arc::new(registry.build().unwrap()));
        let a = store.load("Node", json!({"id": 1})).unwrap();
        let b = store.load("Node", json!({"id": 2})).unwrap();
        store.make_relation(a, b, RelationKind::Related).unwrap();
        store.make_relation(b, a, RelationKind::Related).unwrap();

        assert_eq!(
            store.dump(a, DumpOptions::default()),
            Err(StoreError::DumpCycle(a))
        );
    }
}
