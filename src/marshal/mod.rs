//! Value marshal: conversions at the embedding boundary
//!
//! `HostValue` is the simplified value type native callers exchange with the
//! bridge (no `Rc`/`RefCell` exposure). Conversions preserve double-precision
//! numbers, sequence order, and every mapping key. Native objects never
//! flatten: a handle nested anywhere inside a structured value crosses the
//! boundary as a handle and its methods stay callable after extraction.

use crate::bridge::Handle;
use crate::error::{Error, Result};
use crate::runtime::value::Value;
use rustc_hash::FxHashMap as HashMap;
use std::collections::HashMap as StdHashMap;

/// Simplified value for the embedding boundary
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Seq(Vec<HostValue>),
    Map(StdHashMap<String, HostValue>),
    Handle(Handle),
}

impl HostValue {
    /// Convenience constructor for string values
    pub fn string(s: impl Into<String>) -> HostValue {
        HostValue::String(s.into())
    }
}

/// The shape a native caller expects from `to_native`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Any marshalable shape
    Any,
    Bool,
    Number,
    String,
    Seq,
    Map,
    Handle,
}

/// Convert a host value into a script value
pub fn to_script(value: HostValue) -> Value {
    match value {
        HostValue::Undefined => Value::Undefined,
        HostValue::Null => Value::Null,
        HostValue::Bool(b) => Value::Boolean(b),
        HostValue::Number(n) => Value::Number(n),
        HostValue::String(s) => Value::String(s),
        HostValue::Seq(items) => {
            Value::new_array(items.into_iter().map(to_script).collect())
        }
        HostValue::Map(entries) => {
            let mut map: HashMap<String, Value> = HashMap::default();
            for (key, value) in entries {
                map.insert(key, to_script(value));
            }
            Value::new_map(map)
        }
        HostValue::Handle(handle) => Value::Native(handle),
    }
}

/// Convert a script value into a host value of the expected shape.
///
/// Coercion policy: when a `Number` is expected, strings parse numerically
/// and booleans map to 0/1; no other implicit coercion is performed.
/// Functions and other non-data values fail `UnmarshalableType`.
pub fn to_native(value: &Value, expected: Expected) -> Result<HostValue> {
    match expected {
        Expected::Any => to_native_any(value),
        Expected::Bool => match value {
            Value::Boolean(b) => Ok(HostValue::Bool(*b)),
            other => Err(mismatch("boolean", other)),
        },
        Expected::Number => match value {
            Value::Number(n) => Ok(HostValue::Number(*n)),
            Value::Boolean(b) => Ok(HostValue::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(HostValue::Number)
                .map_err(|_| Error::unmarshalable(format!("cannot parse '{}' as a number", s))),
            other => Err(mismatch("number", other)),
        },
        Expected::String => match value {
            Value::String(s) => Ok(HostValue::String(s.clone())),
            // Stringification is explicit and total for data values
            Value::Number(_) | Value::Boolean(_) => Ok(HostValue::String(value.to_display())),
            other => Err(mismatch("string", other)),
        },
        Expected::Seq => match value {
            Value::Array(_) => to_native_any(value),
            other => Err(mismatch("sequence", other)),
        },
        Expected::Map => match value {
            Value::Map(_) => to_native_any(value),
            other => Err(mismatch("mapping", other)),
        },
        Expected::Handle => match value {
            Value::Native(handle) => Ok(HostValue::Handle(*handle)),
            other => Err(mismatch("native object", other)),
        },
    }
}

fn to_native_any(value: &Value) -> Result<HostValue> {
    match value {
        Value::Undefined => Ok(HostValue::Undefined),
        Value::Null => Ok(HostValue::Null),
        Value::Boolean(b) => Ok(HostValue::Bool(*b)),
        Value::Number(n) => Ok(HostValue::Number(*n)),
        Value::String(s) => Ok(HostValue::String(s.clone())),
        Value::Array(items) => {
            let items = items.borrow();
            let mut seq = Vec::with_capacity(items.len());
            for item in items.iter() {
                seq.push(to_native_any(item)?);
            }
            Ok(HostValue::Seq(seq))
        }
        Value::Map(entries) => {
            let entries = entries.borrow();
            let mut map = StdHashMap::with_capacity(entries.len());
            for (key, value) in entries.iter() {
                map.insert(key.clone(), to_native_any(value)?);
            }
            Ok(HostValue::Map(map))
        }
        Value::Native(handle) => Ok(HostValue::Handle(*handle)),
        Value::Function(f) => Err(Error::unmarshalable(format!(
            "script function '{}' cannot cross the boundary as data",
            f.name
        ))),
        Value::NativeFunction(f) => Err(Error::unmarshalable(format!(
            "native function '{}' cannot cross the boundary as data",
            f.name
        ))),
        Value::Error(e) => Err(Error::unmarshalable(format!(
            "error value '{}' cannot cross the boundary as data",
            e.name
        ))),
    }
}

fn mismatch(expected: &str, got: &Value) -> Error {
    Error::unmarshalable(format!("expected {}, got {}", expected, got.type_of()))
}

/// Enumerate `(index, value)` pairs of a sequence without mutating it
pub fn entries(value: &Value) -> Result<Vec<(usize, Value)>> {
    match value {
        Value::Array(items) => Ok(items
            .borrow()
            .iter()
            .cloned()
            .enumerate()
            .collect()),
        other => Err(mismatch("sequence", other)),
    }
}

/// Convert a host value to JSON. Handles are not data and fail
/// `UnmarshalableType`.
pub fn to_json(value: &HostValue) -> Result<serde_json::Value> {
    match value {
        HostValue::Undefined | HostValue::Null => Ok(serde_json::Value::Null),
        HostValue::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        HostValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| Error::unmarshalable("non-finite number is not valid JSON")),
        HostValue::String(s) => Ok(serde_json::Value::String(s.clone())),
        HostValue::Seq(items) => {
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                array.push(to_json(item)?);
            }
            Ok(serde_json::Value::Array(array))
        }
        HostValue::Map(entries) => {
            let mut object = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                object.insert(key.clone(), to_json(value)?);
            }
            Ok(serde_json::Value::Object(object))
        }
        HostValue::Handle(handle) => Err(Error::unmarshalable(format!(
            "native object '{}' is not JSON-representable",
            handle.class()
        ))),
    }
}

/// Convert JSON into a host value
pub fn from_json(value: &serde_json::Value) -> HostValue {
    match value {
        serde_json::Value::Null => HostValue::Null,
        serde_json::Value::Bool(b) => HostValue::Bool(*b),
        serde_json::Value::Number(n) => HostValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => HostValue::String(s.clone()),
        serde_json::Value::Array(items) => {
            HostValue::Seq(items.iter().map(from_json).collect())
        }
        serde_json::Value::Object(entries) => HostValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Access, HandleRegistry, NativeObject};

    struct Marker;

    impl NativeObject for Marker {
        fn class_name(&self) -> &'static str {
            "marker"
        }
    }

    #[test]
    fn test_primitive_round_trip() {
        let values = vec![
            HostValue::Undefined,
            HostValue::Null,
            HostValue::Bool(true),
            HostValue::Number(13.37),
            HostValue::string("hello"),
        ];
        for v in values {
            let script = to_script(v.clone());
            assert_eq!(to_native(&script, Expected::Any).unwrap(), v);
        }
    }

    #[test]
    fn test_seq_round_trip_preserves_order() {
        let v = HostValue::Seq(vec![
            HostValue::Number(1.0),
            HostValue::Number(2.0),
            HostValue::Number(3.0),
        ]);
        let script = to_script(v.clone());
        assert_eq!(to_native(&script, Expected::Seq).unwrap(), v);
    }

    #[test]
    fn test_map_round_trip_preserves_all_keys() {
        let mut entries = StdHashMap::new();
        entries.insert("first".to_string(), HostValue::Number(0.5));
        entries.insert("second".to_string(), HostValue::Number(13.37));
        entries.insert("blurgh".to_string(), HostValue::Number(123.456));
        let v = HostValue::Map(entries);
        let script = to_script(v.clone());
        assert_eq!(to_native(&script, Expected::Map).unwrap(), v);
    }

    #[test]
    fn test_nested_handle_round_trips_as_handle() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(Marker, Access::Mutable);

        let mut entries = StdHashMap::new();
        entries.insert("special".to_string(), HostValue::Handle(handle));
        entries.insert("weight".to_string(), HostValue::Number(0.5));

        let script = to_script(HostValue::Map(entries));
        let back = to_native(&script, Expected::Map).unwrap();
        match back {
            HostValue::Map(m) => match m.get("special") {
                Some(HostValue::Handle(h)) => assert!(h.same_identity(&handle)),
                other => panic!("expected nested handle, got {:?}", other),
            },
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_number_coercion_policy() {
        assert_eq!(
            to_native(&Value::String("21".to_string()), Expected::Number).unwrap(),
            HostValue::Number(21.0)
        );
        assert_eq!(
            to_native(&Value::Boolean(true), Expected::Number).unwrap(),
            HostValue::Number(1.0)
        );
        assert!(to_native(&Value::String("nope".to_string()), Expected::Number).is_err());
        assert!(to_native(&Value::Null, Expected::Number).is_err());
    }

    #[test]
    fn test_function_is_unmarshalable() {
        let f = Value::NativeFunction(std::rc::Rc::new(crate::runtime::value::NativeFunction {
            name: "print".to_string(),
            func: std::rc::Rc::new(|_| Ok(Value::Undefined)),
        }));
        let err = to_native(&f, Expected::Any).unwrap_err();
        assert_eq!(err.script_name(), "UnmarshalableType");
    }

    #[test]
    fn test_entries_does_not_mutate() {
        let array = Value::new_array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let pairs = entries(&array).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (0, Value::Number(1.0)));
        assert_eq!(pairs[1], (1, Value::Number(2.0)));
        // Source is intact
        assert_eq!(entries(&array).unwrap().len(), 2);
    }

    #[test]
    fn test_json_round_trip() {
        let mut entries = StdHashMap::new();
        entries.insert("a".to_string(), HostValue::Number(1.0));
        entries.insert(
            "b".to_string(),
            HostValue::Seq(vec![HostValue::Bool(false), HostValue::string("x")]),
        );
        let v = HostValue::Map(entries);
        let json = to_json(&v).unwrap();
        assert_eq!(from_json(&json), v);
    }

    #[test]
    fn test_handle_is_not_json() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(Marker, Access::Mutable);
        let err = to_json(&HostValue::Handle(handle)).unwrap_err();
        assert_eq!(err.script_name(), "UnmarshalableType");
    }
}
