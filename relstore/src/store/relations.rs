//! Relation graph
//!
//! Directed, typed edges stored as buckets: for every source node, a map
//! from `(target type, relation kind)` to the ordered list of targets.
//! Buckets are created on first write and never pre-allocated. The graph is
//! not symmetric; back-relations are separate edges the caller maintains.

use crate::ids::{Node, RelationKind, TypeTag};
use std::collections::HashMap;
use thiserror::Error;

/// Bucket discriminant: runtime type of the target plus relation kind
pub type BucketKey = (TypeTag, RelationKind);

/// Buckets of one source node
pub type Buckets = HashMap<BucketKey, Vec<Node>>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeError {
    #[error("edge already present")]
    Duplicate,
    #[error("edge not present")]
    Missing,
}

/// Outcome of replacing a placeholder target in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retarget {
    Replaced,
    /// The replacement was already in the bucket; the placeholder was dropped
    Collapsed,
    /// The placeholder is no longer in the bucket
    Absent,
}

#[derive(Debug, Default, Clone)]
pub struct RelationGraph {
    pub(crate) buckets: HashMap<Node, Buckets>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `target` to the bucket `(source, target_type, kind)`
    pub fn connect(
        &mut self,
        source: Node,
        target: Node,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Result<(), EdgeError> {
        let bucket = self
            .buckets
            .entry(source)
            .or_default()
            .entry((target_type, kind))
            .or_default();

        if bucket.contains(&target) {
            return Err(EdgeError::Duplicate);
        }

        bucket.push(target);
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        source: &Node,
        target: &Node,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Result<(), EdgeError> {
        let bucket = self
            .buckets
            .get_mut(source)
            .and_then(|buckets| buckets.get_mut(&(target_type, kind)))
            .ok_or(EdgeError::Missing)?;

        let position = bucket
            .iter()
            .position(|node| node == target)
            .ok_or(EdgeError::Missing)?;

        bucket.remove(position);
        Ok(())
    }

    /// Empty a bucket, returning what it held
    pub fn clear_all(
        &mut self,
        source: &Node,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Vec<Node> {
        self.buckets
            .get_mut(source)
            .and_then(|buckets| buckets.get_mut(&(target_type, kind)))
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Live bucket contents in insertion order
    pub fn query_many(&self, source: &Node, target_type: TypeTag, kind: RelationKind) -> &[Node] {
        self.buckets
            .get(source)
            .and_then(|buckets| buckets.get(&(target_type, kind)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn query_one(
        &self,
        source: &Node,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> Option<&Node> {
        self.query_many(source, target_type, kind).first()
    }

    pub fn contains(
        &self,
        source: &Node,
        target: &Node,
        target_type: TypeTag,
        kind: RelationKind,
    ) -> bool {
        self.query_many(source, target_type, kind).contains(target)
    }

    /// Replace `from` with `to` in one bucket, keeping its position
    pub(crate) fn retarget(
        &mut self,
        source: &Node,
        key: BucketKey,
        from: &Node,
        to: Node,
    ) -> Retarget {
        let Some(bucket) = self
            .buckets
            .get_mut(source)
            .and_then(|buckets| buckets.get_mut(&key))
        else {
            return Retarget::Absent;
        };

        let Some(position) = bucket.iter().position(|node| node == from) else {
            return Retarget::Absent;
        };

        if bucket.contains(&to) {
            bucket.remove(position);
            Retarget::Collapsed
        } else {
            bucket[position] = to;
            Retarget::Replaced
        }
    }

    /// Drop a source node whose buckets are all empty
    pub(crate) fn prune_source(&mut self, source: &Node) {
        if self
            .buckets
            .get(source)
            .is_some_and(|buckets| buckets.values().all(Vec::is_empty))
        {
            self.buckets.remove(source);
        }
    }

    /// Detach every bucket of a source node
    pub(crate) fn take_source(&mut self, source: &Node) -> Option<Buckets> {
        self.buckets.remove(source)
    }

    /// Append buckets to a source node, skipping targets it already has
    ///
    /// Returns the number of skipped targets.
    pub(crate) fn merge_source(&mut self, source: Node, incoming: Buckets) -> usize {
        let existing = self.buckets.entry(source).or_default();
        let mut skipped = 0;

        for (key, targets) in incoming {
            let bucket = existing.entry(key).or_default();
            for target in targets {
                if bucket.contains(&target) {
                    skipped += 1;
                } else {
                    bucket.push(target);
                }
            }
        }

        skipped
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|buckets| buckets.values())
            .map(Vec::len)
            .sum()
    }

    /// Number of nodes that have ever been an edge source
    pub fn source_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over `(source, bucket key, targets)`
    pub fn iter(&self) -> impl Iterator<Item = (&Node, &BucketKey, &[Node])> {
        self.buckets.iter().flat_map(|(source, buckets)| {
            buckets
                .iter()
                .map(move |(key, targets)| (source, key, targets.as_slice()))
        })
    }
}
