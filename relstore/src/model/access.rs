//! Relation mutation protocol
//!
//! Writes to relation fields keep forward edges and back-relations in
//! lock-step. Every mutation is validated against the current graph before
//! anything is applied, so a failing call leaves the store untouched.

use super::FieldValue;
use crate::error::StoreError;
use crate::ids::{FieldId, KeyValue, Node, RecordId, RelationKind};
use crate::schema::{AccessMode, Field, FieldKind, Relation};
use crate::store::Store;
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

impl Store {
    /// Write a field of a record
    ///
    /// Single-valued relations accept `FieldValue::One` (or a `null` value to
    /// unset), multi-valued ones `FieldValue::Many`.
    pub fn set_field(
        &mut self,
        record: RecordId,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), StoreError> {
        let field = self.lookup_field(record, name)?;
        self.check_access(&field, AccessMode::SET, "set")?;
        let value = value.into();

        let rel = match &field.kind {
            FieldKind::Plain => return self.set_plain(record, &field, value),
            FieldKind::Nested(rel) | FieldKind::Relationship(rel) => *rel,
            FieldKind::KeyNested(key) => key.relation,
        };

        match (rel.many, value) {
            (false, FieldValue::One(new)) => self.replace_one(record, &field, &rel, new)?,
            (false, FieldValue::Value(Value::Null)) => self.replace_one(record, &field, &rel, None)?,
            (true, FieldValue::Many(new)) => self.replace_many(record, &field, &rel, &new)?,
            (many, other) => {
                return Err(StoreError::type_mismatch(format!(
                    "{} expects {}, got {}",
                    self.field_label(field.id),
                    if many { "a list of records" } else { "a single record" },
                    other.shape()
                )))
            }
        }

        self.sync_key_origin(record, &field)
    }

    /// Assign a single-valued relation field
    pub fn set_one(
        &mut self,
        record: RecordId,
        name: &str,
        target: Option<RecordId>,
    ) -> Result<(), StoreError> {
        self.set_field(record, name, FieldValue::One(target))
    }

    /// Replace the contents of a multi-valued relation field
    pub fn set_many(
        &mut self,
        record: RecordId,
        name: &str,
        targets: Vec<RecordId>,
    ) -> Result<(), StoreError> {
        self.set_field(record, name, FieldValue::Many(targets))
    }

    /// Mutable view of a multi-valued relation field
    pub fn relation_list(
        &mut self,
        record: RecordId,
        name: &str,
    ) -> Result<RelationList<'_>, StoreError> {
        let field = self.lookup_field(record, name)?;
        let rel = match field.kind.relation() {
            Some(rel) if rel.many => *rel,
            _ => {
                return Err(StoreError::type_mismatch(format!(
                    "{} is not a multi-valued relation",
                    self.field_label(field.id)
                )))
            }
        };
        self.check_access(&field, AccessMode::SET, "set")?;

        Ok(RelationList {
            store: self,
            owner: record,
            field,
            rel,
        })
    }

    fn set_plain(&mut self, record: RecordId, field: &Field, value: FieldValue) -> Result<(), StoreError> {
        if field.key {
            return Err(StoreError::KeyFieldImmutable(self.field_label(field.id)));
        }

        let value = match value {
            FieldValue::Value(value) => value,
            other => {
                return Err(StoreError::type_mismatch(format!(
                    "{} expects a plain value, got {}",
                    self.field_label(field.id),
                    other.shape()
                )))
            }
        };

        self.record_mut(record)?.data.insert(field.name.clone(), value);
        Ok(())
    }

    /// Single-valued replace: back edge of the old target off, back edge of the
    /// new target on, then the forward edge
    fn replace_one(
        &mut self,
        record: RecordId,
        field: &Field,
        rel: &Relation,
        new: Option<RecordId>,
    ) -> Result<(), StoreError> {
        let holder_type = self.type_of(record)?;
        let holder = Node::Record(record);
        let old = self
            .graph()
            .query_one(&holder, rel.target, rel.kind)
            .cloned();
        let new_node = new.map(Node::Record);

        if old == new_node {
            return Ok(());
        }

        if let Some(id) = new {
            self.check_target(field, rel, id)?;
        }

        if let Some(back) = rel.back {
            if let Some(old) = &old {
                if !self.graph().contains(old, &holder, holder_type, back) {
                    return Err(self.missing_back_edge(old, record, back));
                }
            }
            if let Some(new) = &new_node {
                if self.graph().contains(new, &holder, holder_type, back) {
                    return Err(StoreError::DuplicateRelation {
                        from: self.describe(new),
                        to: self.describe(&holder),
                        kind: back,
                    });
                }
            }
        }

        if let Some(back) = rel.back {
            if let Some(old) = &old {
                self.disconnect_nodes(old, &holder, back)?;
            }
            if let Some(new) = &new_node {
                self.connect_nodes(new.clone(), holder.clone(), back)?;
            }
        }

        self.remove_all_relations(record, rel.target, rel.kind)?;
        if let Some(new) = new_node {
            self.connect_nodes(holder, new, rel.kind)?;
        }

        trace!(record = %record, field = %field.name, "Single relation replaced");
        Ok(())
    }

    /// Multi-valued replace: all back edges of the old members off, back edges
    /// of the new members on, forward edges in the given order
    fn replace_many(
        &mut self,
        record: RecordId,
        field: &Field,
        rel: &Relation,
        new: &[RecordId],
    ) -> Result<(), StoreError> {
        let holder_type = self.type_of(record)?;
        let holder = Node::Record(record);
        let old: Vec<Node> = self
            .graph()
            .query_many(&holder, rel.target, rel.kind)
            .to_vec();
        let new_nodes: Vec<Node> = new.iter().copied().map(Node::Record).collect();

        if old == new_nodes {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(new.len());
        for &id in new {
            self.check_target(field, rel, id)?;
            if !seen.insert(id) {
                return Err(StoreError::DuplicateRelation {
                    from: self.describe(&holder),
                    to: self.describe(&Node::Record(id)),
                    kind: rel.kind,
                });
            }
        }

        if let Some(back) = rel.back {
            for node in &old {
                if !self.graph().contains(node, &holder, holder_type, back) {
                    return Err(self.missing_back_edge(node, record, back));
                }
            }
            for node in new_nodes.iter().filter(|node| !old.contains(node)) {
                if self.graph().contains(node, &holder, holder_type, back) {
                    return Err(StoreError::DuplicateRelation {
                        from: self.describe(node),
                        to: self.describe(&holder),
                        kind: back,
                    });
                }
            }

            for node in &old {
                self.disconnect_nodes(node, &holder, back)?;
            }
            for node in &new_nodes {
                self.connect_nodes(node.clone(), holder.clone(), back)?;
            }
        }

        self.remove_all_relations(record, rel.target, rel.kind)?;
        for node in new_nodes {
            self.connect_nodes(holder.clone(), node, rel.kind)?;
        }

        trace!(
            record = %record,
            field = %field.name,
            removed = old.len(),
            added = new.len(),
            "Relation list replaced"
        );
        Ok(())
    }

    /// A target must have the field's target type; key-nested targets must
    /// also carry the key the holder's raw data refers to them by
    fn check_target(&self, field: &Field, rel: &Relation, target: RecordId) -> Result<(), StoreError> {
        let ty = self.type_of(target)?;
        if ty != rel.target {
            return Err(StoreError::type_mismatch(format!(
                "{} expects {}, got {}",
                self.field_label(field.id),
                self.schema().type_name(rel.target),
                self.describe(&Node::Record(target))
            )));
        }

        if let FieldKind::KeyNested(key) = &field.kind {
            if self.key_of(target, key.key_field)?.is_none() {
                return Err(StoreError::invalid_key(format!(
                    "{} has no {}",
                    self.describe(&Node::Record(target)),
                    self.field_label(key.key_field)
                )));
            }
        }
        Ok(())
    }

    fn missing_back_edge(&self, from: &Node, to: RecordId, kind: RelationKind) -> StoreError {
        StoreError::not_found(format!(
            "back-relation {} from {} to {}",
            kind,
            self.describe(from),
            self.describe(&Node::Record(to))
        ))
    }

    /// Key value a record holds for a key field
    fn key_of(&self, record: RecordId, key_field: FieldId) -> Result<Option<KeyValue>, StoreError> {
        let data = self.record(record)?;
        Ok(self
            .schema()
            .field(key_field)
            .and_then(|field| data.get(&field.name))
            .and_then(KeyValue::from_json))
    }

    /// Rewrite the raw key attribute of a key-nested field from its edges
    pub(crate) fn sync_key_origin(&mut self, record: RecordId, field: &Field) -> Result<(), StoreError> {
        let FieldKind::KeyNested(key) = &field.kind else {
            return Ok(());
        };

        let nodes = self
            .graph()
            .query_many(&Node::Record(record), key.relation.target, key.relation.kind)
            .to_vec();

        let mut encoded = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let value = match node {
                Node::Record(id) => self.key_of(*id, key.key_field)?,
                Node::Pending(pending) => Some(pending.key.clone()),
            };
            if let Some(value) = value {
                encoded.push(key.codec.encode(&value));
            }
        }

        let raw = if key.relation.many {
            Value::Array(encoded)
        } else {
            encoded.into_iter().next().unwrap_or(Value::Null)
        };

        self.record_mut(record)?.data.insert(key.origin.clone(), raw);
        Ok(())
    }
}

/// Mutable view of a multi-valued relation field
///
/// Every operation keeps the forward bucket and the back-relations of its
/// members consistent. Positional operations are not supported: the order
/// of a relation is its insertion order.
pub struct RelationList<'a> {
    store: &'a mut Store,
    owner: RecordId,
    field: Field,
    rel: Relation,
}

impl RelationList<'_> {
    fn holder(&self) -> Node {
        Node::Record(self.owner)
    }

    fn members(&self) -> &[Node] {
        self.store
            .graph()
            .query_many(&self.holder(), self.rel.target, self.rel.kind)
    }

    /// Resolved members in insertion order
    pub fn to_vec(&self) -> Vec<RecordId> {
        self.members().iter().filter_map(Node::as_record).collect()
    }

    /// Number of resolved members, matching `to_vec`
    pub fn len(&self) -> usize {
        self.members().iter().filter(|node| node.as_record().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members still waiting for their key
    pub fn pending_len(&self) -> usize {
        self.members().iter().filter(|node| node.as_pending().is_some()).count()
    }

    pub fn contains(&self, target: RecordId) -> bool {
        self.members().contains(&Node::Record(target))
    }

    pub fn append(&mut self, target: RecordId) -> Result<(), StoreError> {
        self.extend([target])
    }

    /// Append several records; nothing is appended if any of them fails
    pub fn extend(&mut self, targets: impl IntoIterator<Item = RecordId>) -> Result<(), StoreError> {
        let targets: Vec<RecordId> = targets.into_iter().collect();
        let holder = self.holder();
        let holder_type = self.store.type_of(self.owner)?;

        let mut seen = HashSet::with_capacity(targets.len());
        for &id in &targets {
            self.store.check_target(&self.field, &self.rel, id)?;
            let node = Node::Record(id);
            if !seen.insert(id) || self.members().contains(&node) {
                return Err(StoreError::DuplicateRelation {
                    from: self.store.describe(&holder),
                    to: self.store.describe(&node),
                    kind: self.rel.kind,
                });
            }
            if let Some(back) = self.rel.back {
                if self.store.graph().contains(&node, &holder, holder_type, back) {
                    return Err(StoreError::DuplicateRelation {
                        from: self.store.describe(&node),
                        to: self.store.describe(&holder),
                        kind: back,
                    });
                }
            }
        }

        for id in targets {
            let node = Node::Record(id);
            self.store
                .connect_nodes(holder.clone(), node.clone(), self.rel.kind)?;
            if let Some(back) = self.rel.back {
                self.store.connect_nodes(node, holder.clone(), back)?;
            }
        }

        self.store.sync_key_origin(self.owner, &self.field)
    }

    pub fn remove(&mut self, target: RecordId) -> Result<(), StoreError> {
        let holder = self.holder();
        let node = Node::Record(target);
        let holder_type = self.store.type_of(self.owner)?;

        if !self.members().contains(&node) {
            return Err(StoreError::not_found(format!(
                "{} in {} of {}",
                self.store.describe(&node),
                self.field.name,
                self.store.describe(&holder)
            )));
        }
        if let Some(back) = self.rel.back {
            if !self.store.graph().contains(&node, &holder, holder_type, back) {
                return Err(self.store.missing_back_edge(&node, self.owner, back));
            }
        }

        self.store.disconnect_nodes(&holder, &node, self.rel.kind)?;
        if let Some(back) = self.rel.back {
            self.store.disconnect_nodes(&node, &holder, back)?;
        }

        self.store.sync_key_origin(self.owner, &self.field)
    }

    /// Remove every member, back-relations first
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let holder = self.holder();
        let members = self.members().to_vec();

        if let Some(back) = self.rel.back {
            let holder_type = self.store.type_of(self.owner)?;
            for node in &members {
                if !self.store.graph().contains(node, &holder, holder_type, back) {
                    return Err(self.store.missing_back_edge(node, self.owner, back));
                }
            }
            for node in &members {
                self.store.disconnect_nodes(node, &holder, back)?;
            }
        }

        self.store
            .remove_all_relations(self.owner, self.rel.target, self.rel.kind)?;
        self.store.sync_key_origin(self.owner, &self.field)
    }

    /// Relations are ordered by insertion only
    pub fn insert(&mut self, _index: usize, _target: RecordId) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("positional insert into a relation"))
    }

    pub fn remove_at(&mut self, _index: usize) -> Result<RecordId, StoreError> {
        Err(StoreError::Unsupported("positional removal from a relation"))
    }
}
