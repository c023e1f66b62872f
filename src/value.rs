//! Tagged values crossing the host/script boundary

use rhai::Dynamic;

use crate::list::DynList;
use crate::table::DynTable;

/// A single value crossing the bridge between the pipeline and a script
///
/// Numbers keep their integral bit: `Int` and `Float` are distinct
/// variants so the host never loses type fidelity on the way through the
/// engine. Container variants hold *handles*; cloning a `Value` clones the
/// handle, not the storage, which is what makes the aliasing contract of
/// [`DynTable`]/[`DynList`] work.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent/nil value (distinct from a missing key only on the host side)
    Null,
    /// Boolean
    Bool(bool),
    /// Integral number
    Int(i64),
    /// Floating-point number
    Float(f64),
    /// String
    Str(String),
    /// Handle to a shared, growable sequence
    List(DynList),
    /// Handle to a shared, growable map
    Map(DynTable),
    /// Opaque host object a script may only pass around or query through
    /// registered methods, never decompose
    Opaque(Dynamic),
}

impl Value {
    /// Convert into the engine's native dynamic type
    ///
    /// Container handles are wrapped as-is so the script and the host keep
    /// addressing the same storage.
    pub fn into_dynamic(self) -> Dynamic {
        match self {
            Value::Null => Dynamic::UNIT,
            Value::Bool(b) => Dynamic::from(b),
            Value::Int(i) => Dynamic::from(i),
            Value::Float(f) => Dynamic::from(f),
            Value::Str(s) => Dynamic::from(s),
            Value::List(list) => Dynamic::from(list),
            Value::Map(table) => Dynamic::from(table),
            Value::Opaque(d) => d,
        }
    }

    /// Convert an engine value into a tagged value
    ///
    /// Dynamic container handles pass through untouched. Native script
    /// arrays and maps are deep-copied into fresh shared storage; a native
    /// map whose keys form an unbroken integer run starting at 0 becomes a
    /// list (the canonical array-detection rule, applied at every native
    /// map conversion site). Anything else the engine can hold, such as a
    /// registered host object, stays opaque.
    pub fn from_dynamic(value: Dynamic) -> Self {
        if value.is_unit() {
            return Value::Null;
        }
        if value.is::<bool>() {
            return Value::Bool(value.as_bool().unwrap_or_default());
        }
        if value.is::<i64>() {
            return Value::Int(value.as_int().unwrap_or_default());
        }
        if value.is::<f64>() {
            return Value::Float(value.as_float().unwrap_or_default());
        }
        if value.is::<char>() {
            return Value::Str(value.as_char().unwrap_or_default().to_string());
        }
        if value.is::<rhai::ImmutableString>() {
            return match value.into_immutable_string() {
                Ok(s) => Value::Str(s.to_string()),
                Err(_) => Value::Null,
            };
        }
        if value.is::<DynTable>() {
            return match value.try_cast::<DynTable>() {
                Some(t) => Value::Map(t),
                None => Value::Null,
            };
        }
        if value.is::<DynList>() {
            return match value.try_cast::<DynList>() {
                Some(l) => Value::List(l),
                None => Value::Null,
            };
        }
        if value.is::<rhai::Array>() {
            return match value.try_cast::<rhai::Array>() {
                Some(arr) => Value::List(DynList::from_values(
                    arr.into_iter().map(Value::from_dynamic).collect(),
                )),
                None => Value::Null,
            };
        }
        if value.is::<rhai::Map>() {
            return match value.try_cast::<rhai::Map>() {
                Some(map) => from_native_map(map),
                None => Value::Null,
            };
        }
        Value::Opaque(value)
    }
}

/// Deep-copy a native script map into fresh shared storage
///
/// Applies the array-detection rule: if every key parses as an integer and
/// together they form the unbroken run `0..n`, the map is really a
/// sequence and converts to a [`DynList`]; otherwise it stays a
/// [`DynTable`].
fn from_native_map(map: rhai::Map) -> Value {
    let mut entries: Vec<(String, Value)> = map
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::from_dynamic(v)))
        .collect();

    if let Some(run) = try_as_integer_run(&entries) {
        return Value::List(DynList::from_values(run));
    }

    let table = DynTable::new();
    for (key, value) in entries.drain(..) {
        table.set(&key, value);
    }
    Value::Map(table)
}

fn try_as_integer_run(entries: &[(String, Value)]) -> Option<Vec<Value>> {
    if entries.is_empty() {
        return None;
    }
    let mut indexed: Vec<(usize, Value)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        indexed.push((key.parse::<usize>().ok()?, value.clone()));
    }
    indexed.sort_by_key(|(i, _)| *i);
    for (expected, (actual, _)) in indexed.iter().enumerate() {
        if *actual != expected {
            return None;
        }
    }
    Some(indexed.into_iter().map(|(_, v)| v).collect())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.snapshot() == b.snapshot(),
            (Value::Map(a), Value::Map(b)) => a.snapshot() == b.snapshot(),
            // Opaque handles carry no comparable identity
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
