//! In-memory device registry — the authoritative cache read by presentation
//! layers.
//!
//! Records are indexed by id and, secondarily, by command topic. Both indexes
//! are always mutated together. Rows written outside the engine can give two
//! ids the same topic; both records are kept and the topic resolves to the
//! one that claimed it first.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use lightsync_domain::change::{ListDiff, diff};
use lightsync_domain::device::{DeviceId, DeviceRecord};

/// Id- and topic-indexed device records.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    by_id: BTreeMap<DeviceId, DeviceRecord>,
    by_topic: HashMap<String, DeviceId>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, returning the previous value for its id.
    ///
    /// A topic already claimed by another id stays with that id. The new
    /// record is still stored and reachable by id.
    pub fn upsert(&mut self, record: DeviceRecord) -> Option<DeviceRecord> {
        let previous = self.by_id.insert(record.id.clone(), record.clone());
        if let Some(previous) = &previous
            && previous.command_topic != record.command_topic
        {
            self.unindex(&previous.command_topic, &previous.id);
        }

        match self.by_topic.get(&record.command_topic) {
            Some(owner) if owner != &record.id => {
                let already_shadowed = previous
                    .as_ref()
                    .is_some_and(|p| p.command_topic == record.command_topic);
                if already_shadowed {
                    return previous;
                }
                tracing::error!(
                    topic = %record.command_topic,
                    owner = %owner,
                    device_id = %record.id,
                    "topic already claimed by another device, keeping both records"
                );
            }
            _ => {
                self.by_topic.insert(record.command_topic, record.id);
            }
        }
        previous
    }

    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<&DeviceRecord> {
        self.by_id.get(id)
    }

    #[must_use]
    pub fn get_by_topic(&self, topic: &str) -> Option<&DeviceRecord> {
        self.by_topic.get(topic).and_then(|id| self.by_id.get(id))
    }

    /// Remove a record from both indexes. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: &DeviceId) -> Option<DeviceRecord> {
        let removed = self.by_id.remove(id)?;
        self.unindex(&removed.command_topic, id);
        Some(removed)
    }

    /// Drop every record and load `records` instead.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = DeviceRecord>) {
        self.by_id.clear();
        self.by_topic.clear();
        for record in records {
            self.upsert(record);
        }
    }

    /// Owned copy of all records, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.by_id.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Release `topic` if `id` owns it, handing it to any other record that
    /// shares it.
    fn unindex(&mut self, topic: &str, id: &DeviceId) {
        if self.by_topic.get(topic) != Some(id) {
            return;
        }
        self.by_topic.remove(topic);
        if let Some(other) = self.by_id.values().find(|r| r.command_topic == topic) {
            self.by_topic.insert(topic.to_string(), other.id.clone());
        }
    }
}

/// Cloneable handle to a [`DeviceRegistry`] behind a single lock.
///
/// Readers take the read lock; the engine worker is the only writer. Every
/// write goes through [`update`](Self::update), which reports what changed.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<DeviceRegistry>>,
}

impl SharedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&DeviceRegistry) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Mutate the registry and return the minimal diff the mutation caused.
    pub fn update(&self, f: impl FnOnce(&mut DeviceRegistry)) -> ListDiff {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.snapshot();
        f(&mut guard);
        diff(&before, &guard.snapshot())
    }

    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<DeviceRecord> {
        self.read(|registry| registry.get(id).cloned())
    }

    #[must_use]
    pub fn get_by_topic(&self, topic: &str) -> Option<DeviceRecord> {
        self.read(|registry| registry.get_by_topic(topic).cloned())
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.read(DeviceRegistry::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> DeviceRecord {
        DeviceRecord::first_sight(DeviceId::new(id).unwrap(), format!("home/light/{id}"))
    }

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s).unwrap()
    }

    #[test]
    fn should_find_record_by_id_and_topic_after_upsert() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("esp42"));

        assert_eq!(registry.get(&id("esp42")).unwrap().name, "ESP Device");
        assert_eq!(
            registry.get_by_topic("home/light/esp42").unwrap().id,
            id("esp42")
        );
    }

    #[test]
    fn should_return_previous_record_when_replacing() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("esp42"));

        let mut renamed = record("esp42");
        renamed.name = "Desk".to_string();
        let previous = registry.upsert(renamed).unwrap();

        assert_eq!(previous.name, "ESP Device");
        assert_eq!(registry.get(&id("esp42")).unwrap().name, "Desk");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_remove_from_both_indexes() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("esp42"));

        let removed = registry.remove(&id("esp42"));

        assert!(removed.is_some());
        assert!(registry.get(&id("esp42")).is_none());
        assert!(registry.get_by_topic("home/light/esp42").is_none());
    }

    #[test]
    fn should_ignore_removal_of_unknown_id() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.remove(&id("ghost")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn should_keep_both_records_when_topic_is_claimed_by_second_id() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("a"));

        let mut other = record("b");
        other.command_topic = "home/light/a".to_string();
        registry.upsert(other);

        assert!(registry.get(&id("a")).is_some());
        assert!(registry.get(&id("b")).is_some());
        assert_eq!(registry.get_by_topic("home/light/a").unwrap().id, id("a"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn should_hand_shared_topic_to_remaining_record_when_owner_is_removed() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("a"));
        let mut other = record("b");
        other.command_topic = "home/light/a".to_string();
        registry.upsert(other);

        registry.remove(&id("a"));

        assert_eq!(registry.get_by_topic("home/light/a").unwrap().id, id("b"));
    }

    #[test]
    fn should_keep_owner_indexed_when_second_claimer_is_removed() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("a"));
        let mut other = record("b");
        other.command_topic = "home/light/a".to_string();
        registry.upsert(other);

        registry.remove(&id("b"));

        assert_eq!(registry.get_by_topic("home/light/a").unwrap().id, id("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_move_topic_index_when_record_changes_topic() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("a"));

        let mut moved = record("a");
        moved.command_topic = "office/light/a".to_string();
        registry.upsert(moved);

        assert!(registry.get_by_topic("home/light/a").is_none());
        assert_eq!(registry.get_by_topic("office/light/a").unwrap().id, id("a"));
    }

    #[test]
    fn should_snapshot_in_id_order() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("c"));
        registry.upsert(record("a"));
        registry.upsert(record("b"));

        let ids: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn should_replace_all_records() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(record("old"));

        registry.replace_all(vec![record("x"), record("y")]);

        assert!(registry.get_by_topic("home/light/old").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn should_report_diff_of_shared_update() {
        let shared = SharedRegistry::new();
        let inserted = shared.update(|r| {
            r.upsert(record("a"));
        });
        assert_eq!(inserted.inserted.len(), 1);

        let unchanged = shared.update(|r| {
            r.upsert(record("a"));
        });
        assert!(unchanged.is_empty());

        let removed = shared.update(|r| {
            r.remove(&id("a"));
        });
        assert_eq!(removed.removed.len(), 1);
    }

    #[test]
    fn should_hand_out_snapshots_detached_from_registry() {
        let shared = SharedRegistry::new();
        shared.update(|r| {
            r.upsert(record("a"));
        });

        let mut copy = shared.snapshot();
        copy[0].light_on = true;

        assert!(!shared.get(&id("a")).unwrap().light_on);
    }
}
