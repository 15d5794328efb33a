// ── Record cache ──
//
// The single owner of every live record. Callers hold `RecordKey` handles;
// reads clone a snapshot or borrow through a closure, writes go through
// `update`. Lookup-or-insert runs under one lock so two responses racing
// to insert the same identity cannot both win.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use tracing::trace;

use crate::model::{Record, RecordKey};

/// Identity-deduplicating, id-ordered record arena.
///
/// Iteration order is ascending id, security before data on ties. The
/// first instance of an identity to arrive is kept; later copies parsed
/// from other responses are discarded.
pub struct RecordCache {
    records: RwLock<BTreeMap<RecordKey, Record>>,

    /// Secondary index: thing key -> handle.
    thing_keys: DashMap<String, RecordKey>,

    /// Secondary index: login name -> handle of a security record.
    login_ids: DashMap<String, RecordKey>,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCache {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            thing_keys: DashMap::new(),
            login_ids: DashMap::new(),
        }
    }

    /// Insert `record` unless its identity is already cached. Returns the
    /// handle either way.
    pub fn merge(&self, record: Record) -> RecordKey {
        let key = record.key();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(&key) {
            trace!(%key, "kept existing instance");
        } else {
            trace!(%key, "cached new record");
            self.index(&record);
            records.insert(key, record);
        }
        key
    }

    /// Merge many records. Handles come back in input order without
    /// repeats.
    pub fn merge_all(&self, records: impl IntoIterator<Item = Record>) -> Vec<RecordKey> {
        let mut keys: Vec<RecordKey> = Vec::new();
        for record in records {
            let key = self.merge(record);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// A snapshot of the cached record.
    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        self.with(key, Clone::clone)
    }

    /// Borrow the cached record for the duration of `f`.
    pub fn with<R>(&self, key: &RecordKey, f: impl FnOnce(&Record) -> R) -> Option<R> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(f)
    }

    /// Mutate the cached record in place. Every holder of `key` sees the
    /// change.
    ///
    /// The thing-key and login-name indexes follow the edit: the old names
    /// stop resolving and the new ones resolve to `key`.
    pub fn update<R>(&self, key: &RecordKey, f: impl FnOnce(&mut Record) -> R) -> Option<R> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.get_mut(key)?;
        let before = IndexedNames::of(record);
        let result = f(record);
        if IndexedNames::of(record) != before {
            self.unindex(*key, &before);
            self.index(record);
        }
        Some(result)
    }

    /// Handle of the thing with string key `thing_key`, if cached.
    pub fn key_for_thing(&self, thing_key: &str) -> Option<RecordKey> {
        self.thing_keys.get(thing_key).map(|r| *r.value())
    }

    /// Handle of the security record for login name `login_id`, if cached.
    pub fn key_for_login_id(&self, login_id: &str) -> Option<RecordKey> {
        self.login_ids.get(login_id).map(|r| *r.value())
    }

    /// All handles in cache order.
    pub fn keys(&self) -> Vec<RecordKey> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.thing_keys.clear();
        self.login_ids.clear();
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn index(&self, record: &Record) {
        let key = record.key();
        let names = IndexedNames::of(record);
        if let Some(thing_key) = names.thing_key {
            self.thing_keys.insert(thing_key, key);
        }
        if let Some(login_id) = names.login_id {
            self.login_ids.insert(login_id, key);
        }
    }

    /// Drop index entries for `names` that still point at `key`.
    fn unindex(&self, key: RecordKey, names: &IndexedNames) {
        if let Some(thing_key) = &names.thing_key {
            self.thing_keys.remove_if(thing_key, |_, k| *k == key);
        }
        if let Some(login_id) = &names.login_id {
            self.login_ids.remove_if(login_id, |_, k| *k == key);
        }
    }
}

/// The secondary-index names a record currently carries.
#[derive(PartialEq)]
struct IndexedNames {
    thing_key: Option<String>,
    login_id: Option<String>,
}

impl IndexedNames {
    fn of(record: &Record) -> Self {
        Self {
            thing_key: record.thing().and_then(|t| t.key.clone()),
            login_id: record
                .security()
                .and_then(|s| s.login_id())
                .map(str::to_owned),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Database, RecordKind};
    use crate::parse::parse_value;

    fn records(value: &serde_json::Value) -> Vec<Record> {
        parse_value(value).records
    }

    #[test]
    fn existing_instance_wins() {
        let cache = RecordCache::new();
        let first = records(&json!({"places": [{"id": 2, "name": "First", "lang": "en"}]}));
        let second = records(&json!({"places": [{"id": 2, "name": "Second", "lang": "en"}]}));

        let a = cache.merge_all(first);
        let b = cache.merge_all(second);
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&a[0]).unwrap().name(), "First");
    }

    #[test]
    fn edits_are_shared_through_handles() {
        let cache = RecordCache::new();
        let key = cache.merge_all(records(&json!({"things": [{"id": 3, "name": "Lamp", "lang": "en", "writeable": true}]})))[0];
        let again = cache.merge_all(records(&json!({"things": [{"id": 3, "name": "Lamp", "lang": "en"}]})))[0];

        cache.update(&key, |r| r.set_name("Desk lamp")).unwrap().unwrap();
        assert_eq!(cache.with(&again, |r| r.name().to_owned()).unwrap(), "Desk lamp");
        assert!(cache.get(&again).unwrap().is_dirty());
    }

    #[test]
    fn same_id_in_both_databases_coexists() {
        let cache = RecordCache::new();
        cache.merge_all(records(&json!({
            "people": [{"id": 4, "name": "Ann", "lang": "en"}],
            "logins": [{"id": 4, "name": "ann", "lang": "en", "login_id": "ann"}],
        })));
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.keys(),
            vec![RecordKey::security(4), RecordKey::data(4)]
        );
    }

    #[test]
    fn iteration_is_sorted() {
        let cache = RecordCache::new();
        cache.merge_all(records(&json!({
            "places": [
                {"id": 9, "name": "c", "lang": "en"},
                {"id": 1, "name": "a", "lang": "en"}
            ],
            "logins": [{"id": 5, "name": "b", "lang": "en", "login_id": "b"}],
            "things": [{"id": 5, "name": "d", "lang": "en"}]
        })));
        let keys = cache.keys();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(keys[1].database, Database::Security);
        assert_eq!(keys[2].database, Database::Data);
    }

    #[test]
    fn secondary_indexes() {
        let cache = RecordCache::new();
        cache.merge_all(records(&json!({
            "things": [{"id": 8, "name": "Lamp", "lang": "en", "key": "lamp-1"}],
            "logins": [{"id": 2, "name": "Bob", "lang": "en", "login_id": "bob"}]
        })));
        assert_eq!(cache.key_for_thing("lamp-1"), Some(RecordKey::data(8)));
        assert_eq!(cache.key_for_login_id("bob"), Some(RecordKey::security(2)));
        assert_eq!(
            cache.with(&RecordKey::security(2), Record::kind),
            Some(RecordKind::Login)
        );
    }

    #[test]
    fn clear_empties_everything() {
        let cache = RecordCache::new();
        cache.merge_all(records(&json!({"things": [{"id": 8, "name": "L", "lang": "en", "key": "k"}]})));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.key_for_thing("k"), None);
    }

    #[test]
    fn renamed_thing_key_moves_index() {
        let cache = RecordCache::new();
        let key = cache.merge_all(records(&json!({
            "things": [{"id": 8, "name": "Lamp", "lang": "en", "writeable": true, "key": "lamp"}]
        })))[0];

        cache
            .update(&key, |r| r.edit_thing().map(|t| t.key = Some("desk".into())))
            .unwrap()
            .unwrap();

        assert_eq!(cache.key_for_thing("lamp"), None);
        assert_eq!(cache.key_for_thing("desk"), Some(key));
    }

    #[test]
    fn renamed_login_id_moves_index() {
        let cache = RecordCache::new();
        let key = cache.merge_all(records(&json!({
            "logins": [{"id": 2, "name": "Bob", "lang": "en", "writeable": true, "login_id": "bob"}]
        })))[0];

        cache.update(&key, |r| r.set_login_id("robert")).unwrap().unwrap();

        assert_eq!(cache.key_for_login_id("bob"), None);
        assert_eq!(cache.key_for_login_id("robert"), Some(key));
    }
}
