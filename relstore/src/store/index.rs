//! Identity index
//!
//! Maps `(key field, key value)` to the one record registered under it.

use crate::ids::{FieldId, KeyValue, RecordId};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct IdentityIndex {
    pub(crate) entries: HashMap<(FieldId, KeyValue), RecordId>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key to a record
    ///
    /// Returns `Ok(true)` for a new binding, `Ok(false)` if the key is already
    /// bound to the same record, and `Err(existing)` if it is bound to another.
    pub fn register(
        &mut self,
        field: FieldId,
        key: KeyValue,
        record: RecordId,
    ) -> Result<bool, RecordId> {
        match self.entries.get(&(field, key.clone())) {
            Some(&existing) if existing == record => Ok(false),
            Some(&existing) => Err(existing),
            None => {
                self.entries.insert((field, key), record);
                Ok(true)
            }
        }
    }

    pub fn lookup(&self, field: FieldId, key: &KeyValue) -> Option<RecordId> {
        self.entries.get(&(field, key.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
