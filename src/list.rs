//! Growable, script-addressable sequence container

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Dynamic, Engine};

use crate::value::Value;

/// Shared, growable sequence of tagged values
///
/// Like [`DynTable`](crate::table::DynTable), a `DynList` is a handle over
/// shared storage; clones alias, they do not copy. Sparse growth through
/// [`set`](DynList::set) pads the gap with `Null` holes.
#[derive(Clone, Default)]
pub struct DynList {
    data: Arc<Mutex<Vec<Value>>>,
}

impl DynList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from existing values
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            data: Arc::new(Mutex::new(values)),
        }
    }

    /// Value at `index`, or `None` when out of range
    ///
    /// Out-of-range access is deliberately not a fault; scripts may try
    /// indices freely and a missing slot simply reads as absent.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.data.lock().get(index).cloned()
    }

    /// Store `value` at `index`, growing the list when needed
    ///
    /// Intermediate slots created by growth are filled with `Null`.
    pub fn set(&self, index: usize, value: Value) {
        let mut data = self.data.lock();
        if index >= data.len() {
            data.resize(index + 1, Value::Null);
        }
        data[index] = value;
    }

    /// Remove the value at `index`, shifting everything after it one slot
    /// to the left; out-of-range indices are a silent no-op
    pub fn del(&self, index: usize) {
        let mut data = self.data.lock();
        if index < data.len() {
            data.remove(index);
        }
    }

    /// Number of slots, counting `Null` holes
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Whether the list has no slots
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// Copy of the current slots; container values remain aliases
    pub(crate) fn snapshot(&self) -> Vec<Value> {
        self.data.lock().clone()
    }
}

impl fmt::Debug for DynList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DynList").field(&*self.data.lock()).finish()
    }
}

/// Register the list type and its script surface
///
/// Script surface:
///
/// ```text
/// let l = dyn_list();
/// l.set(0, "x");
/// l.get(0);
/// l.len();
/// l.del(0);
/// ```
pub(crate) fn register(engine: &mut Engine) {
    engine.register_type_with_name::<DynList>("DynList");
    engine.register_fn("dyn_list", DynList::new);
    engine.register_fn("get", |l: &mut DynList, index: i64| -> Dynamic {
        usize::try_from(index)
            .ok()
            .and_then(|i| l.get(i))
            .map(Value::into_dynamic)
            .unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("set", |l: &mut DynList, index: i64, value: Dynamic| {
        // Negative indices are ignored, matching the silent no-op contract
        if let Ok(i) = usize::try_from(index) {
            l.set(i, Value::from_dynamic(value));
        }
    });
    engine.register_fn("del", |l: &mut DynList, index: i64| {
        if let Ok(i) = usize::try_from(index) {
            l.del(i);
        }
    });
    engine.register_fn("len", |l: &mut DynList| l.len() as i64);
}
