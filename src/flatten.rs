//! Flattening of nested JSON objects into single-level rows.
//!
//! Nested objects recurse with an underscore-joined path prefix; arrays are
//! deliberately never recursed into and become one TEXT cell holding their
//! canonical JSON serialization.

use crate::types::FlatRow;
use serde_json::{Map, Value};

/// Flatten one parsed JSON object into a single-level row.
///
/// `{"a":{"b":1,"c":{"d":2}}}` becomes `{"a_b":1,"a_c_d":2}`. Key collisions
/// across sibling branches are only possible when the source data already has
/// colliding flattened names; merge is an unconditional overwrite, so the last
/// write wins. Booleans are kept as booleans here and converted to 0/1 only at
/// insert time.
pub fn flatten(object: &Map<String, Value>) -> FlatRow {
    let mut row = FlatRow::new();
    flatten_into(object, "", &mut row);
    row
}

fn flatten_into(object: &Map<String, Value>, prefix: &str, row: &mut FlatRow) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}_{}", prefix, key)
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &path, row),
            // Display on Value yields compact canonical JSON text.
            Value::Array(_) => {
                row.insert(path, Value::String(value.to_string()));
            }
            other => {
                row.insert(path, other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flatten_json(value: serde_json::Value) -> FlatRow {
        match value {
            Value::Object(obj) => flatten(&obj),
            _ => panic!("test input must be an object"),
        }
    }

    #[test]
    fn test_already_flat() {
        let row = flatten_json(json!({"id": 1, "name": "a"}));
        assert_eq!(row.get("id").unwrap(), &json!(1));
        assert_eq!(row.get("name").unwrap(), &json!("a"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_nested_paths() {
        let row = flatten_json(json!({"a": {"b": 1, "c": {"d": 2}}}));
        assert_eq!(row.get("a_b").unwrap(), &json!(1));
        assert_eq!(row.get("a_c_d").unwrap(), &json!(2));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_arrays_become_json_text() {
        let row = flatten_json(json!({"tags": ["x", "y"]}));
        assert_eq!(row.get("tags").unwrap(), &json!(r#"["x","y"]"#));
    }

    #[test]
    fn test_array_of_objects_is_one_cell() {
        let row = flatten_json(json!({"posts": [{"id": 1}, {"id": 2}]}));
        assert_eq!(row.get("posts").unwrap(), &json!(r#"[{"id":1},{"id":2}]"#));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_null_and_bool_preserved() {
        let row = flatten_json(json!({"gone": null, "flag": true}));
        assert_eq!(row.get("gone").unwrap(), &Value::Null);
        assert_eq!(row.get("flag").unwrap(), &json!(true));
    }

    #[test]
    fn test_colliding_paths_last_write_wins() {
        // "a_b" appears both literally and via nesting; source order decides.
        let row = flatten_json(json!({"a_b": 1, "a": {"b": 2}}));
        assert_eq!(row.get("a_b").unwrap(), &json!(2));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_key_order_follows_source() {
        let row = flatten_json(json!({"z": 1, "a": {"m": 2}, "b": 3}));
        let keys: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a_m", "b"]);
    }
}
