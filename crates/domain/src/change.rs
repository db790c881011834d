//! List diffing — the minimal change set between two device snapshots.
//!
//! Items are matched by [`DeviceId`]; an item counts as changed when any field
//! differs. Both snapshots are expected to share a stable relative order
//! (registry snapshots are ordered by id), so moves are never reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceId, DeviceRecord};

/// A record and its index in the list it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedRecord {
    pub position: usize,
    pub record: DeviceRecord,
}

/// An id and the index it occupied in the old list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedRecord {
    pub position: usize,
    pub id: DeviceId,
}

/// Minimal changes turning an old list into a new one.
///
/// `removed` positions index into the old list, `inserted` and `updated`
/// positions index into the new list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDiff {
    pub inserted: Vec<PositionedRecord>,
    pub removed: Vec<RemovedRecord>,
    pub updated: Vec<PositionedRecord>,
}

impl ListDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Compute the minimal diff between `old` and `new`.
#[must_use]
pub fn diff(old: &[DeviceRecord], new: &[DeviceRecord]) -> ListDiff {
    let old_index: HashMap<&DeviceId, usize> = old
        .iter()
        .enumerate()
        .map(|(position, record)| (&record.id, position))
        .collect();
    let new_ids: HashMap<&DeviceId, usize> = new
        .iter()
        .enumerate()
        .map(|(position, record)| (&record.id, position))
        .collect();

    let removed = old
        .iter()
        .enumerate()
        .filter(|(_, record)| !new_ids.contains_key(&record.id))
        .map(|(position, record)| RemovedRecord {
            position,
            id: record.id.clone(),
        })
        .collect();

    let mut inserted = Vec::new();
    let mut updated = Vec::new();
    for (position, record) in new.iter().enumerate() {
        match old_index.get(&record.id) {
            None => inserted.push(PositionedRecord {
                position,
                record: record.clone(),
            }),
            Some(&old_position) if old[old_position] != *record => {
                updated.push(PositionedRecord {
                    position,
                    record: record.clone(),
                });
            }
            Some(_) => {}
        }
    }

    ListDiff {
        inserted,
        removed,
        updated,
    }
}
