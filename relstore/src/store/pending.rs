//! Pending key relations
//!
//! Remembers which buckets hold a placeholder as a target, so the
//! placeholder can be swapped for the record in place once its key is
//! registered. Placeholders that are *sources* of edges need no bookkeeping:
//! their buckets live in the relation graph under the placeholder node.
//!
//! The store forgets a site when its placeholder is removed from the bucket.
//! Resolution still skips sites whose placeholder is gone.

use crate::ids::{PendingRef, RecordId, RelationKind};
use std::collections::HashMap;

/// Bucket `(source, placeholder type, kind)` holding a placeholder target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Site {
    pub source: RecordId,
    pub kind: RelationKind,
}

#[derive(Debug, Default, Clone)]
pub struct PendingIndex {
    pub(crate) sites: HashMap<PendingRef, Vec<Site>>,
}

impl PendingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, pending: PendingRef, site: Site) {
        let sites = self.sites.entry(pending).or_default();
        if !sites.contains(&site) {
            sites.push(site);
        }
    }

    /// Drop a site whose placeholder left the bucket
    pub(crate) fn forget(&mut self, pending: &PendingRef, site: Site) {
        if let Some(sites) = self.sites.get_mut(pending) {
            sites.retain(|known| *known != site);
            if sites.is_empty() {
                self.sites.remove(pending);
            }
        }
    }

    pub(crate) fn take(&mut self, pending: &PendingRef) -> Vec<Site> {
        self.sites.remove(pending).unwrap_or_default()
    }

    /// Number of keys with at least one waiting site
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn site_count(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FieldId, KeyValue, TypeTag};

    fn pending(key: i64) -> PendingRef {
        PendingRef::new(
            FieldId {
                owner: TypeTag(0),
                slot: 0,
            },
            KeyValue::Int(key),
        )
    }

    #[test]
    fn test_record_and_take() {
        let mut index = PendingIndex::new();
        let site = Site {
            source: RecordId(1),
            kind: RelationKind::Child,
        };

        index.record(pending(1), site);
        index.record(pending(1), site);
        index.record(
            pending(2),
            Site {
                source: RecordId(2),
                kind: RelationKind::Parent,
            },
        );

        assert_eq!(index.len(), 2);
        assert_eq!(index.site_count(), 2);
        index.forget(&pending(2), site);
        assert_eq!(index.len(), 2);
        index.forget(
            &pending(2),
            Site {
                source: RecordId(2),
                kind: RelationKind::Parent,
            },
        );
        assert_eq!(index.len(), 1);

        index.record(pending(2), site);
        assert_eq!(index.take(&pending(1)), vec![site]);
        assert!(index.take(&pending(1)).is_empty());
        assert_eq!(index.len(), 1);
        assert_eq!(index.site_count(), 1);
    }
}
