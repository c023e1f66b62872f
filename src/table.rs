//! Growable, script-addressable map container

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Dynamic, Engine};

use crate::list::DynList;
use crate::value::Value;

/// Shared, growable map of tagged values
///
/// A `DynTable` is a *handle*: cloning it (or retrieving it out of another
/// container) yields a new handle to the same underlying storage, so
/// mutations through any handle are visible through all of them. Replacing
/// the value stored at a parent key does not retarget handles obtained
/// earlier; they keep pointing at the storage they were created with.
///
/// The table is destroyed together with its owning session once the last
/// handle is dropped.
#[derive(Clone, Default)]
pub struct DynTable {
    data: Arc<Mutex<HashMap<String, Value>>>,
}

impl DynTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from existing entries
    pub fn from_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            data: Arc::new(Mutex::new(entries)),
        }
    }

    /// Value stored under `key`, or `None` when absent
    ///
    /// A container value comes back as a new handle aliasing the stored
    /// storage, never as a copy.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Store `value` under `key`, inserting or replacing
    pub fn set(&self, key: &str, value: Value) {
        self.data.lock().insert(key.to_string(), value);
    }

    /// Remove `key`; absent keys are left alone
    pub fn del(&self, key: &str) {
        self.data.lock().remove(key);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Whether `key` is present (a stored `Null` still counts as present)
    pub fn key_exists(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// All keys in lexicographic order, for determinism
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of the current entries; values that are containers remain
    /// aliases of the stored storage
    pub(crate) fn snapshot(&self) -> HashMap<String, Value> {
        self.data.lock().clone()
    }
}

impl fmt::Debug for DynTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DynTable").field(&*self.data.lock()).finish()
    }
}

/// Register the table type and its script surface
///
/// Script surface:
///
/// ```text
/// let t = dyn_table();
/// t.set("k", 1);
/// t.get("k");
/// t.len();
/// t.keys();
/// t.key_exists("k");
/// t.del("k");
/// ```
pub(crate) fn register(engine: &mut Engine) {
    engine.register_type_with_name::<DynTable>("DynTable");
    engine.register_fn("dyn_table", DynTable::new);
    engine.register_fn("get", |t: &mut DynTable, key: &str| -> Dynamic {
        t.get(key).map(Value::into_dynamic).unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("set", |t: &mut DynTable, key: &str, value: Dynamic| {
        t.set(key, Value::from_dynamic(value));
    });
    engine.register_fn("del", |t: &mut DynTable, key: &str| t.del(key));
    engine.register_fn("len", |t: &mut DynTable| t.len() as i64);
    engine.register_fn("key_exists", |t: &mut DynTable, key: &str| t.key_exists(key));
    engine.register_fn("keys", |t: &mut DynTable| -> DynList {
        DynList::from_values(t.keys().into_iter().map(Value::Str).collect())
    });
}
