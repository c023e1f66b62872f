//! Bidirectional conversion between host values and script values
//!
//! Host data enters the engine as [`DynTable`]/[`DynList`] handles (never
//! native script containers) so that script-side mutation stays visible to
//! anything else holding the same handle. Reading back deep-copies the
//! containers into plain host data.

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::list::DynList;
use crate::table::DynTable;
use crate::value::Value;

/// Project a host value into the script's value space
///
/// Scalars and null map directly. Arrays and objects are materialized as
/// fresh [`DynList`]/[`DynTable`] storage so later script mutation is
/// observable through the returned handle.
pub fn host_to_script(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => number_to_value(n),
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => {
            Value::List(DynList::from_values(items.iter().map(host_to_script).collect()))
        }
        Json::Object(fields) => {
            let entries: HashMap<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), host_to_script(v)))
                .collect();
            Value::Map(DynTable::from_entries(entries))
        }
    }
}

fn number_to_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else if let Some(u) = n.as_u64() {
        // Beyond i64 range; carried as float, the engine has no u64
        Value::Float(u as f64)
    } else {
        Value::Float(n.as_f64().unwrap_or_default())
    }
}

/// Copy a script value back into host data
///
/// Containers are recursively deep-copied. A float equal to its own floor
/// becomes a host integer; this normalization is relied on downstream and
/// is idempotent on a second application. Opaque values carry nothing the
/// host can decompose: they are dropped from maps and read as null in
/// lists.
pub fn script_to_host(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(Number::from(*i)),
        Value::Float(f) => float_to_json(*f),
        Value::Str(s) => Json::String(s.clone()),
        Value::List(list) => Json::Array(
            list.snapshot()
                .iter()
                .map(script_to_host)
                .collect(),
        ),
        Value::Map(table) => {
            let mut fields = JsonMap::new();
            for (key, value) in table.snapshot() {
                if matches!(value, Value::Opaque(_)) {
                    continue;
                }
                fields.insert(key, script_to_host(&value));
            }
            Json::Object(fields)
        }
        Value::Opaque(_) => Json::Null,
    }
}

fn float_to_json(f: f64) -> Json {
    if f.is_finite() && f == f.floor() && (i64::MIN as f64..=i64::MAX as f64).contains(&f) {
        return Json::Number(Number::from(f as i64));
    }
    Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

/// Error-like result of an upstream call, as seen by scripts
///
/// The surrounding pipeline hands failed upstream exchanges to scripts as
/// plain tables rather than opaque handles so scripts can inspect and
/// rewrite them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamHttpError {
    /// Status code of the failed exchange
    pub status: u16,
    /// Response body text
    pub body: String,
    /// Content type of the body
    pub encoding: String,
    /// Backend name, for named variants
    pub name: Option<String>,
}

impl UpstreamHttpError {
    /// Project into a table with the fixed keys scripts rely on:
    /// `http_status_code`, `http_body`, `http_body_encoding` and, for
    /// named variants, `name`.
    pub fn to_table(&self) -> DynTable {
        let table = DynTable::new();
        table.set("http_status_code", Value::Int(i64::from(self.status)));
        table.set("http_body", Value::Str(self.body.clone()));
        table.set("http_body_encoding", Value::Str(self.encoding.clone()));
        if let Some(name) = &self.name {
            table.set("name", Value::Str(name.clone()));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_preserves_structure() {
        let host = json!({
            "path": "/v1/users",
            "active": true,
            "retries": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "nested": {"deep": [1, 2, {"k": null}]},
        });
        assert_eq!(script_to_host(&host_to_script(&host)), host);
    }

    #[test]
    fn integral_float_normalizes_to_integer() {
        assert_eq!(script_to_host(&Value::Float(2.0)), json!(2));
        assert_eq!(script_to_host(&Value::Float(-3.0)), json!(-3));
        assert_eq!(script_to_host(&Value::Float(2.5)), json!(2.5));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = script_to_host(&host_to_script(&json!(7.0)));
        let twice = script_to_host(&host_to_script(&once));
        assert_eq!(once, json!(7));
        assert_eq!(twice, once);
    }

    #[test]
    fn non_finite_floats_degrade_to_null() {
        assert_eq!(script_to_host(&Value::Float(f64::NAN)), Json::Null);
        assert_eq!(script_to_host(&Value::Float(f64::INFINITY)), Json::Null);
    }

    #[test]
    fn host_containers_become_dynamic_handles() {
        let projected = host_to_script(&json!({"items": [1, 2]}));
        let Value::Map(table) = projected else {
            panic!("expected a table");
        };

        // Mutation through a retrieved handle is visible on read-back
        let Some(Value::List(items)) = table.get("items") else {
            panic!("expected a list");
        };
        items.set(2, Value::Int(3));

        assert_eq!(
            script_to_host(&Value::Map(table)),
            json!({"items": [1, 2, 3]})
        );
    }

    #[test]
    fn opaque_values_are_dropped_from_maps_and_nulled_in_lists() {
        let table = DynTable::new();
        table.set("keep", Value::Int(1));
        table.set("opaque", Value::Opaque(rhai::Dynamic::from(std::time::Duration::ZERO)));
        assert_eq!(script_to_host(&Value::Map(table)), json!({"keep": 1}));

        let list = DynList::from_values(vec![
            Value::Int(1),
            Value::Opaque(rhai::Dynamic::from(std::time::Duration::ZERO)),
        ]);
        assert_eq!(script_to_host(&Value::List(list)), json!([1, null]));
    }

    #[test]
    fn upstream_error_projection_uses_fixed_keys() {
        let err = UpstreamHttpError {
            status: 502,
            body: "bad gateway".to_string(),
            encoding: "text/plain".to_string(),
            name: None,
        };
        let table = err.to_table();
        assert_eq!(table.get("http_status_code"), Some(Value::Int(502)));
        assert_eq!(table.get("http_body"), Some(Value::from("bad gateway")));
        assert_eq!(table.get("http_body_encoding"), Some(Value::from("text/plain")));
        assert!(!table.key_exists("name"));

        let named = UpstreamHttpError {
            name: Some("users-api".to_string()),
            ..err
        };
        assert_eq!(named.to_table().get("name"), Some(Value::from("users-api")));
    }
}
