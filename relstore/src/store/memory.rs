//! Memory size calculation for store data structures
//!
//! Provides functions for estimating heap memory usage of a `Store`.
//! Useful for benchmarking and monitoring.
//!
//! # Example
//!
//! ```
//! use relstore::schema::{FieldDef, TypeRegistry};
//! use relstore::{memory, Store};
//! use std::sync::Arc;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register("User", vec![FieldDef::key("id")]).unwrap();
//! let store = Store::new(Arc::new(registry.build().unwrap()));
//!
//! let breakdown = memory::store_size(&store);
//! println!("Store uses {} bytes", breakdown.total_bytes);
//! ```

use super::pending::Site;
use super::{Buckets, Record, Store};
use crate::ids::{FieldId, KeyValue, Node, PendingRef, RecordId};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::mem;

// ============================================================================
// Store memory calculation
// ============================================================================

/// Memory breakdown for Store
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreMemory {
    pub total_bytes: usize,
    pub records_bytes: usize,
    pub index_bytes: usize,
    pub relations_bytes: usize,
    pub pending_bytes: usize,
}

/// Calculate memory usage of a Store
pub fn store_size(store: &Store) -> StoreMemory {
    let records_bytes = store.records.capacity() * mem::size_of::<Record>()
        + store
            .records
            .iter()
            .map(|record| map_size(&record.data))
            .sum::<usize>();

    let index_bytes = hashmap_simple_size::<(FieldId, KeyValue), RecordId>(&store.index.entries)
        + store
            .index
            .entries
            .keys()
            .map(|(_, key)| key_size(key))
            .sum::<usize>();

    let relations_bytes = relations_size(&store.graph.buckets);

    let pending_bytes = hashmap_with_vec_size::<PendingRef, Site>(&store.pending.sites)
        + store
            .pending
            .sites
            .keys()
            .map(|pending| key_size(&pending.key))
            .sum::<usize>();

    StoreMemory {
        total_bytes: records_bytes + index_bytes + relations_bytes + pending_bytes,
        records_bytes,
        index_bytes,
        relations_bytes,
        pending_bytes,
    }
}

// ============================================================================
// Helper functions for collection sizes
// ============================================================================

/// Estimate heap size of a HashMap with simple value types (no nested heap)
fn hashmap_simple_size<K, V>(map: &HashMap<K, V>) -> usize {
    map.capacity() * (mem::size_of::<K>() + mem::size_of::<V>() + 16)
}

/// Estimate heap size of a HashMap<K, Vec<V>>
fn hashmap_with_vec_size<K, V>(map: &HashMap<K, Vec<V>>) -> usize {
    let table_size = map.capacity() * (mem::size_of::<K>() + mem::size_of::<Vec<V>>() + 16);
    let vecs_size: usize = map
        .values()
        .map(|v| v.capacity() * mem::size_of::<V>())
        .sum();
    table_size + vecs_size
}

/// Estimate heap size of the two-level bucket map
fn relations_size(buckets: &HashMap<Node, Buckets>) -> usize {
    let table_size = buckets.capacity() * (mem::size_of::<Node>() + mem::size_of::<Buckets>() + 16);
    let inner_size: usize = buckets
        .iter()
        .map(|(source, inner)| node_size(source) + hashmap_with_vec_size(inner))
        .sum();
    table_size + inner_size
}

/// Heap owned by a node (placeholders carry their key)
fn node_size(node: &Node) -> usize {
    match node {
        Node::Record(_) => 0,
        Node::Pending(pending) => key_size(&pending.key),
    }
}

/// Heap owned by a key value
fn key_size(key: &KeyValue) -> usize {
    match key {
        KeyValue::Bool(_) | KeyValue::Int(_) | KeyValue::UInt(_) => 0,
        KeyValue::Str(s) => s.capacity(),
        KeyValue::List(items) => {
            items.capacity() * mem::size_of::<KeyValue>() + items.iter().map(key_size).sum::<usize>()
        }
    }
}

/// Approximate heap size of a JSON object (recursive)
fn map_size(map: &Map<String, Value>) -> usize {
    map.iter()
        .map(|(name, value)| {
            // Entry overhead: key, value and ordering metadata
            name.capacity() + mem::size_of::<String>() + mem::size_of::<Value>() + 16 + value_size(value)
        })
        .sum()
}

fn value_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        Value::String(s) => s.capacity(),
        Value::Array(items) => {
            items.capacity() * mem::size_of::<Value>() + items.iter().map(value_size).sum::<usize>()
        }
        Value::Object(map) => map_size(map),
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Format bytes as human-readable string
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    const GB: usize = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Calculate bytes per record for a store
pub fn bytes_per_record(store: &Store) -> f64 {
    let mem = store_size(store);
    let records = store.len();
    if records == 0 {
        0.0
    } else {
        mem.total_bytes as f64 / records as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{RelationKind, TypeTag};
    use crate::schema::{FieldDef, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn make_store() -> (Store, TypeTag, FieldId) {
        let mut registry = TypeRegistry::new();
        let user = registry
            .register("User", vec![FieldDef::key("id"), FieldDef::plain("name")])
            .unwrap();
        let schema = Arc::new(registry.build().unwrap());
        let id = schema.field_id("User", "id").unwrap();
        (Store::new(schema), user, id)
    }

    fn user(n: i64) -> Map<String, Value> {
        match json!({"id": n, "name": format!("user-{}", n)}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_empty_store_size() {
        let (store, _, _) = make_store();
        let mem = store_size(&store);
        // Empty store should have zero or minimal allocation
        assert_eq!(mem.total_bytes, 0);
        assert_eq!(bytes_per_record(&store), 0.0);
    }

    #[test]
    fn test_store_size_grows() {
        let (mut store, ty, _) = make_store();
        let mem1 = store_size(&store);

        for i in 0..10 {
            store.add(ty, user(i)).unwrap();
        }

        let mem2 = store_size(&store);
        assert!(mem2.total_bytes > mem1.total_bytes);
        assert!(mem2.records_bytes > 0);
        assert!(mem2.index_bytes > 0);
    }

    #[test]
    fn test_pending_relations_are_counted() {
        let (mut store, ty, id) = make_store();
        let first = store.add(ty, user(0)).unwrap();
        let before = store_size(&store);

        store
            .make_key_relation(id, 99, RelationKind::Related, first)
            .unwrap();

        let after = store_size(&store);
        assert!(after.relations_bytes > before.relations_bytes);
        assert!(after.pending_bytes > before.pending_bytes);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }
}
