//! Relational graph store
//!
//! The `Store` owns the record arena, the identity index, the relation graph
//! and the pending-site index, and is the only way to mutate any of them:
//! - `add`: create a record, register its key fields, resolve pending keys
//! - `make_relation` / `remove_relation` / `remove_all_relations`
//! - `make_key_relation` / `make_reverse_key_relation`: deferred-capable edges
//! - `get_related` / `get_one_related`: resolved bucket contents

mod index;
pub mod memory;
mod pending;
mod relations;

pub use index::IdentityIndex;
pub use pending::PendingIndex;
pub use relations::{BucketKey, Buckets, EdgeError, RelationGraph};

use crate::config::{KeyRegistration, StoreConfig};
use crate::error::StoreError;
use crate::ids::{FieldId, KeyValue, Node, PendingRef, RecordId, RelationKind, TypeTag};
use crate::schema::Schema;
use pending::Site;
use relations::Retarget;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A record: its type plus raw attribute data
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) ty: TypeTag,
    pub(crate) data: Map<String, Value>,
}

impl Record {
    pub fn type_tag(&self) -> TypeTag {
        self.ty
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.data.get(attribute)
    }
}

/// In-memory object graph of records
///
/// Single-threaded: every mutation takes `&mut self` and completes before
/// returning. Share across threads only behind an external lock.
#[derive(Debug, Clone)]
pub struct Store {
    schema: Arc<Schema>,
    config: StoreConfig,
    pub(crate) records: Vec<Record>,
    pub(crate) index: IdentityIndex,
    pub(crate) graph: RelationGraph,
    pub(crate) pending: PendingIndex,
}

impl Store {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_config(schema, StoreConfig::default())
    }

    pub fn with_config(schema: Arc<Schema>, config: StoreConfig) -> Self {
        Self {
            schema,
            config,
            records: Vec::new(),
            index: IdentityIndex::new(),
            graph: RelationGraph::new(),
            pending: PendingIndex::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: RecordId) -> Result<&Record, StoreError> {
        self.records
            .get(id.index())
            .ok_or(StoreError::UnknownRecord(id))
    }

    pub(crate) fn record_mut(&mut self, id: RecordId) -> Result<&mut Record, StoreError> {
        self.records
            .get_mut(id.index())
            .ok_or(StoreError::UnknownRecord(id))
    }

    pub fn records(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (RecordId(i as u32), record))
    }

    pub fn type_of(&self, id: RecordId) -> Result<TypeTag, StoreError> {
        self.record(id).map(|record| record.ty)
    }

    /// Create a record and register its key fields
    ///
    /// Every newly bound key immediately resolves the pending relations
    /// declared against it. Key fields that are missing or `null` in `data`
    /// are not indexed.
    ///
    /// A conflict on the first key creates nothing. With
    /// `KeyRegistration::Independent` a conflict on a later key leaves the
    /// record and its earlier bindings in place. With
    /// `KeyRegistration::Atomic` all keys are checked first and nothing is
    /// created on conflict.
    pub fn add(&mut self, ty: TypeTag, data: Map<String, Value>) -> Result<RecordId, StoreError> {
        let schema = Arc::clone(&self.schema);
        let type_def = schema
            .get(ty)
            .ok_or_else(|| StoreError::UnknownType(format!("{:?}", ty)))?;

        let mut keys = Vec::with_capacity(type_def.key_fields().len());
        for &field_id in type_def.key_fields() {
            let name = schema
                .field(field_id)
                .map(|field| field.name.as_str())
                .unwrap_or_default();

            match data.get(name) {
                None | Some(Value::Null) => {
                    trace!(field = %schema.field_label(field_id), "Key field absent, not indexed");
                }
                Some(raw) => {
                    let key = KeyValue::from_json(raw).ok_or_else(|| {
                        StoreError::invalid_key(format!(
                            "{}={} cannot be used as a key",
                            schema.field_label(field_id),
                            raw
                        ))
                    })?;
                    keys.push((field_id, key));
                }
            }
        }

        let checked = match self.config.key_registration {
            KeyRegistration::Atomic => keys.len(),
            KeyRegistration::Independent => keys.len().min(1),
        };
        for (field, key) in &keys[..checked] {
            if let Some(existing) = self.index.lookup(*field, key) {
                return Err(self.duplicate_key(*field, key.clone(), existing));
            }
        }

        let id = RecordId(self.records.len() as u32);
        self.records.push(Record { ty, data });

        let key_count = keys.len();
        for (field, key) in keys {
            match self.index.register(field, key.clone(), id) {
                Ok(true) => self.resolve(PendingRef::new(field, key), id),
                Ok(false) => {}
                Err(existing) => return Err(self.duplicate_key(field, key, existing)),
            }
        }

        debug!(record = %id, ty = type_def.name(), keys = key_count, "Record added");
        Ok(id)
    }

    /// Look up the record registered under a key
    pub fn get(&self, field: FieldId, key: impl Into<KeyValue>) -> Option<RecordId> {
        self.index.lookup(field, &key.into())
    }

    pub fn make_relation(
        &mut self,
        from: RecordId,
        to: RecordId,
        kind: RelationKind,
    ) -> Result<(), StoreError> {
        self.ensure_record(from)?;
        self.connect_nodes(Node::Record(from), Node::Record(to), kind)
    }

    pub fn remove_relation(
        &mut self,
        from: RecordId,
        to: RecordId,
        kind: RelationKind,
    ) -> Result<(), StoreError> {
        self.ensure_record(from)?;
        self.disconnect_nodes(&Node::Record(from), &Node::Record(to), kind)
    }

    /// Empty the bucket `(from, target_type, kind)`. Idempotent.
    pub fn remove_all_relations(
        &mut self,
        from: RecordId,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Result<(), StoreError> {
        self.ensure_record(from)?;
        let removed = self.graph.clear_all(&Node::Record(from), target_type, kind);
        for pending in removed.iter().filter_map(Node::as_pending) {
            self.pending.forget(pending, Site { source: from, kind });
        }
        trace!(record = %from, kind = %kind, removed = removed.len(), "Relations cleared");
        Ok(())
    }

    /// Relate `from` to the record registered under `(field, key)`
    ///
    /// If no record is registered yet, a placeholder takes its place in the
    /// bucket and is replaced in place when the key is registered.
    pub fn make_key_relation(
        &mut self,
        field: FieldId,
        key: impl Into<KeyValue>,
        kind: RelationKind,
        from: RecordId,
    ) -> Result<(), StoreError> {
        let key = key.into();
        self.ensure_key_field(field)?;
        self.ensure_record(from)?;

        match self.index.lookup(field, &key) {
            Some(found) => self.connect_nodes(Node::Record(from), Node::Record(found), kind),
            None => {
                let pending = PendingRef::new(field, key);
                self.connect_nodes(Node::Record(from), Node::Pending(pending.clone()), kind)?;
                trace!(
                    record = %from,
                    key = %pending.key,
                    kind = %kind,
                    "Deferred key relation declared"
                );
                self.pending.record(pending, Site { source: from, kind });
                Ok(())
            }
        }
    }

    /// Relate the record registered under `(field, key)` to `to`
    ///
    /// If no record is registered yet, the edge is kept under a placeholder
    /// source and moved to the record when the key is registered.
    pub fn make_reverse_key_relation(
        &mut self,
        field: FieldId,
        key: impl Into<KeyValue>,
        kind: RelationKind,
        to: RecordId,
    ) -> Result<(), StoreError> {
        let key = key.into();
        self.ensure_key_field(field)?;
        self.ensure_record(to)?;

        let source = match self.index.lookup(field, &key) {
            Some(found) => Node::Record(found),
            None => Node::Pending(PendingRef::new(field, key)),
        };
        self.connect_nodes(source, Node::Record(to), kind)
    }

    /// Resolved records in `(from, target_type, kind)`, in insertion order
    pub fn get_related(
        &self,
        from: RecordId,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Vec<RecordId> {
        self.graph
            .query_many(&Node::Record(from), target_type, kind)
            .iter()
            .filter_map(Node::as_record)
            .collect()
    }

    pub fn get_one_related(
        &self,
        from: RecordId,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Option<RecordId> {
        self.graph
            .query_many(&Node::Record(from), target_type, kind)
            .iter()
            .find_map(Node::as_record)
    }

    /// Placeholders in `(from, target_type, kind)` still waiting for their key
    pub fn pending_related(
        &self,
        from: RecordId,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Vec<PendingRef> {
        self.graph
            .query_many(&Node::Record(from), target_type, kind)
            .iter()
            .filter_map(Node::as_pending)
            .cloned()
            .collect()
    }

    /// Number of distinct keys that relations wait on
    pub fn unresolved_count(&self) -> usize {
        let mut keys: HashSet<&PendingRef> = HashSet::new();
        for (source, _, targets) in self.graph.iter() {
            if targets.is_empty() {
                continue;
            }
            if let Node::Pending(pending) = source {
                keys.insert(pending);
            }
            keys.extend(targets.iter().filter_map(Node::as_pending));
        }
        keys.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `Type.field` label of a field, for messages
    pub fn field_label(&self, field: FieldId) -> String {
        self.schema.field_label(field)
    }

    /// Human-readable form of an edge endpoint, for messages
    pub fn describe(&self, node: &Node) -> String {
        match node {
            Node::Record(id) => match self.records.get(id.index()) {
                Some(record) => format!("{}{}", self.schema.type_name(record.ty), id),
                None => id.to_string(),
            },
            Node::Pending(pending) => {
                format!("{}={}", self.schema.field_label(pending.field), pending.key)
            }
        }
    }

    pub(crate) fn node_type(&self, node: &Node) -> Result<TypeTag, StoreError> {
        match node {
            Node::Record(id) => self.type_of(*id),
            Node::Pending(pending) => Ok(pending.target_type()),
        }
    }

    pub(crate) fn connect_nodes(
        &mut self,
        source: Node,
        target: Node,
        kind: RelationKind,
    ) -> Result<(), StoreError> {
        let target_type = self.node_type(&target)?;
        match self
            .graph
            .connect(source.clone(), target.clone(), target_type, kind)
        {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::DuplicateRelation {
                from: self.describe(&source),
                to: self.describe(&target),
                kind,
            }),
        }
    }

    pub(crate) fn disconnect_nodes(
        &mut self,
        source: &Node,
        target: &Node,
        kind: RelationKind,
    ) -> Result<(), StoreError> {
        let target_type = self.node_type(target)?;
        self.graph
            .disconnect(source, target, target_type, kind)
            .map_err(|_| {
                StoreError::not_found(format!(
                    "relation {} from {} to {}",
                    kind,
                    self.describe(source),
                    self.describe(target)
                ))
            })?;

        match (source, target) {
            (Node::Record(id), Node::Pending(pending)) => {
                self.pending.forget(pending, Site { source: *id, kind });
            }
            (Node::Pending(_), _) => self.graph.prune_source(source),
            (Node::Record(_), Node::Record(_)) => {}
        }
        Ok(())
    }

    pub(crate) fn ensure_record(&self, id: RecordId) -> Result<(), StoreError> {
        self.record(id).map(|_| ())
    }

    fn ensure_key_field(&self, field: FieldId) -> Result<(), StoreError> {
        match self.schema.field(field) {
            Some(def) if def.key => Ok(()),
            Some(_) => Err(StoreError::NotAKeyField(self.schema.field_label(field))),
            None => Err(StoreError::UnknownField {
                ty: self.schema.type_name(field.owner).to_string(),
                field: format!("#{}", field.slot),
            }),
        }
    }

    fn duplicate_key(&self, field: FieldId, key: KeyValue, existing: RecordId) -> StoreError {
        StoreError::DuplicateKey {
            field: self.schema.field_label(field),
            key,
            existing,
        }
    }

    /// Promote every placeholder for `pending` to the record `id`
    fn resolve(&mut self, pending: PendingRef, id: RecordId) {
        let placeholder = Node::Pending(pending.clone());
        let record = Node::Record(id);
        let mut collapsed = 0;

        // Edges whose source is the placeholder move to the record
        let mut outgoing = 0;
        if let Some(buckets) = self.graph.take_source(&placeholder) {
            outgoing = buckets.values().map(Vec::len).sum::<usize>();
            collapsed += self.graph.merge_source(record.clone(), buckets);
        }

        // Placeholders used as targets are replaced in place
        let mut incoming = 0;
        for site in self.pending.take(&pending) {
            let key = (pending.target_type(), site.kind);
            match self
                .graph
                .retarget(&Node::Record(site.source), key, &placeholder, record.clone())
            {
                Retarget::Replaced => incoming += 1,
                Retarget::Collapsed => collapsed += 1,
                Retarget::Absent => {}
            }
        }

        if collapsed > 0 {
            warn!(
                record = %id,
                key = %pending.key,
                collapsed,
                "Dropped duplicate targets while resolving pending key"
            );
        }

        if incoming + outgoing > 0 {
            debug!(
                record = %id,
                key = %pending.key,
                incoming,
                outgoing,
                "Pending key relations resolved"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, TypeRegistry};
    use serde_json::json;

    struct Fixture {
        store: Store,
        entity: TypeTag,
        holder: TypeTag,
        entity_id: FieldId,
        entity_guid: FieldId,
    }

    fn fixture(config: StoreConfig) -> Fixture {
        let mut registry = TypeRegistry::new();
        let entity = registry
            .register(
                "Entity",
                vec![
                    FieldDef::key("id"),
                    FieldDef::key("guid"),
                    FieldDef::plain("name"),
                ],
            )
            .unwrap();
        let holder = registry
            .register("Holder", vec![FieldDef::plain("name")])
            .unwrap();
        let schema = Arc::new(registry.build().unwrap());
        let entity_id = schema.field_id("Entity", "id").unwrap();
        let entity_guid = schema.field_id("Entity", "guid").unwrap();

        Fixture {
            store: Store::with_config(schema, config),
            entity,
            holder,
            entity_id,
            entity_guid,
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_add_registers_every_key() {
        let mut f = fixture(StoreConfig::default());
        let id = f
            .store
            .add(f.entity, object(json!({"id": 1, "guid": "1234", "name": "john"})))
            .unwrap();

        assert_eq!(f.store.get(f.entity_id, 1), Some(id));
        assert_eq!(f.store.get(f.entity_guid, "1234"), Some(id));
        assert_eq!(f.store.get(f.entity_id, 2), None);
    }

    #[test]
    fn test_duplicate_key() {
        let mut f = fixture(StoreConfig::default());
        let first = f.store.add(f.entity, object(json!({"id": 1}))).unwrap();
        let err = f.store.add(f.entity, object(json!({"id": 1}))).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { existing, .. } if existing == first));
        assert_eq!(f.store.get(f.entity_id, 1), Some(first));
        assert_eq!(f.store.len(), 1);
        assert_eq!(f.store.records().count(), 1);
    }

    #[test]
    fn test_conflict_on_first_key_creates_nothing() {
        let mut f = fixture(StoreConfig::default());
        f.store
            .add(f.entity, object(json!({"id": 1, "guid": "a"})))
            .unwrap();

        let err = f
            .store
            .add(f.entity, object(json!({"id": 1, "guid": "b"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(f.store.get(f.entity_guid, "b"), None);
        assert_eq!(f.store.len(), 1);

        // The next record takes the slot the failed one would have used
        let next = f.store.add(f.entity, object(json!({"id": 2}))).unwrap();
        assert_eq!(next, RecordId(1));
    }

    #[test]
    fn test_independent_registration_keeps_first_key() {
        let mut f = fixture(StoreConfig::default());
        f.store
            .add(f.entity, object(json!({"id": 1, "guid": "a"})))
            .unwrap();

        let err = f
            .store
            .add(f.entity, object(json!({"id": 2, "guid": "a"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        // id=2 stays bound to the partially registered record
        let partial = f.store.get(f.entity_id, 2).unwrap();
        assert_eq!(partial, RecordId(1));
        assert_eq!(f.store.len(), 2);
    }

    #[test]
    fn test_atomic_registration_is_all_or_nothing() {
        let mut f = fixture(StoreConfig::default().with_key_registration(KeyRegistration::Atomic));
        f.store
            .add(f.entity, object(json!({"id": 1, "guid": "a"})))
            .unwrap();

        let err = f
            .store
            .add(f.entity, object(json!({"id": 2, "guid": "a"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(f.store.get(f.entity_id, 2), None);
        assert_eq!(f.store.len(), 1);
    }

    #[test]
    fn test_cleared_placeholder_forgets_site() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        f.store
            .make_key_relation(f.entity_id, 1, RelationKind::Parent, holder)
            .unwrap();
        f.store
            .make_key_relation(f.entity_id, 2, RelationKind::Parent, holder)
            .unwrap();
        assert_eq!(f.store.pending.len(), 2);

        f.store
            .remove_all_relations(holder, f.entity, RelationKind::Parent)
            .unwrap();
        assert!(f.store.pending.is_empty());
        assert_eq!(f.store.unresolved_count(), 0);

        // A key showing up after its placeholder was dropped attaches nothing
        f.store.add(f.entity, object(json!({"id": 1}))).unwrap();
        assert!(f
            .store
            .get_related(holder, f.entity, RelationKind::Parent)
            .is_empty());
    }

    #[test]
    fn test_missing_key_is_not_indexed() {
        let mut f = fixture(StoreConfig::default());
        f.store.add(f.entity, object(json!({"name": "a"}))).unwrap();
        f.store
            .add(f.entity, object(json!({"id": null, "name": "b"})))
            .unwrap();
        assert_eq!(f.store.len(), 2);
        assert_eq!(f.store.index.len(), 0);
    }

    #[test]
    fn test_invalid_key() {
        let mut f = fixture(StoreConfig::default());
        let err = f
            .store
            .add(f.entity, object(json!({"id": {"nested": true}})))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(f.store.is_empty());
    }

    #[test]
    fn test_no_duplicate_edges() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        let entity = f.store.add(f.entity, object(json!({"id": 1}))).unwrap();

        f.store
            .make_relation(holder, entity, RelationKind::Child)
            .unwrap();
        let err = f
            .store
            .make_relation(holder, entity, RelationKind::Child)
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateRelation { .. }));
        assert_eq!(
            f.store.get_related(holder, f.entity, RelationKind::Child),
            vec![entity]
        );
    }

    #[test]
    fn test_remove_relation() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        let entity = f.store.add(f.entity, object(json!({"id": 1}))).unwrap();

        assert!(matches!(
            f.store.remove_relation(holder, entity, RelationKind::Child),
            Err(StoreError::NotFound(_))
        ));

        f.store
            .make_relation(holder, entity, RelationKind::Child)
            .unwrap();
        f.store
            .remove_relation(holder, entity, RelationKind::Child)
            .unwrap();
        assert_eq!(
            f.store.get_one_related(holder, f.entity, RelationKind::Child),
            None
        );
    }

    #[test]
    fn test_remove_all_relations_twice() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        let a = f.store.add(f.entity, object(json!({"id": 1}))).unwrap();
        let b = f.store.add(f.entity, object(json!({"id": 2}))).unwrap();
        f.store.make_relation(holder, a, RelationKind::Child).unwrap();
        f.store.make_relation(holder, b, RelationKind::Child).unwrap();

        for _ in 0..2 {
            f.store
                .remove_all_relations(holder, f.entity, RelationKind::Child)
                .unwrap();
            assert!(f
                .store
                .get_related(holder, f.entity, RelationKind::Child)
                .is_empty());
        }
    }

    #[test]
    fn test_key_relation_resolves_immediately() {
        let mut f = fixture(StoreConfig::default());
        let entity = f.store.add(f.entity, object(json!({"id": 123}))).unwrap();
        let holder = f.store.add(f.holder, Map::new()).unwrap();

        f.store
            .make_key_relation(f.entity_id, 123, RelationKind::Parent, holder)
            .unwrap();
        assert_eq!(
            f.store.get_one_related(holder, f.entity, RelationKind::Parent),
            Some(entity)
        );
        assert_eq!(f.store.unresolved_count(), 0);
    }

    #[test]
    fn test_deferred_key_relation_resolves_in_place() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        let first = f.store.add(f.entity, object(json!({"id": 1}))).unwrap();

        f.store
            .make_key_relation(f.entity_id, 1, RelationKind::Parent, holder)
            .unwrap();
        f.store
            .make_key_relation(f.entity_id, 2, RelationKind::Parent, holder)
            .unwrap();
        f.store
            .make_key_relation(f.entity_id, 3, RelationKind::Parent, holder)
            .unwrap();

        assert_eq!(
            f.store.get_related(holder, f.entity, RelationKind::Parent),
            vec![first]
        );
        assert_eq!(
            f.store
                .pending_related(holder, f.entity, RelationKind::Parent)
                .len(),
            2
        );
        assert_eq!(f.store.unresolved_count(), 2);

        let third = f.store.add(f.entity, object(json!({"id": 3}))).unwrap();
        let second = f.store.add(f.entity, object(json!({"id": 2}))).unwrap();

        assert_eq!(
            f.store.get_related(holder, f.entity, RelationKind::Parent),
            vec![first, second, third]
        );
        assert!(f
            .store
            .pending_related(holder, f.entity, RelationKind::Parent)
            .is_empty());
        assert_eq!(f.store.unresolved_count(), 0);
    }

    #[test]
    fn test_deferred_reverse_key_relation() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();

        f.store
            .make_reverse_key_relation(f.entity_id, 456, RelationKind::Child, holder)
            .unwrap();
        assert_eq!(f.store.unresolved_count(), 1);

        let entity = f.store.add(f.entity, object(json!({"id": 456}))).unwrap();
        assert_eq!(
            f.store.get_one_related(entity, f.holder, RelationKind::Child),
            Some(holder)
        );
        assert_eq!(f.store.unresolved_count(), 0);
    }

    #[test]
    fn test_two_keys_resolving_to_one_record_collapse() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        f.store
            .make_key_relation(f.entity_id, 1, RelationKind::Related, holder)
            .unwrap();
        f.store
            .make_key_relation(f.entity_guid, "a", RelationKind::Related, holder)
            .unwrap();

        let entity = f
            .store
            .add(f.entity, object(json!({"id": 1, "guid": "a"})))
            .unwrap();
        assert_eq!(
            f.store.get_related(holder, f.entity, RelationKind::Related),
            vec![entity]
        );
    }

    #[test]
    fn test_key_relation_requires_key_field() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        let name = f.store.schema().field_id("Entity", "name").unwrap();

        assert!(matches!(
            f.store
                .make_key_relation(name, "x", RelationKind::Parent, holder),
            Err(StoreError::NotAKeyField(_))
        ));
    }

    #[test]
    fn test_unknown_record() {
        let mut f = fixture(StoreConfig::default());
        let holder = f.store.add(f.holder, Map::new()).unwrap();
        assert!(matches!(
            f.store
                .make_relation(holder, RecordId(42), RelationKind::Child),
            Err(StoreError::UnknownRecord(_))
        ));
    }
}
