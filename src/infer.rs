//! SQL type inference over a bounded sample of flat rows.
//!
//! The merge policy is deliberately conservative: the first non-null
//! observation sets a column's type, and any later observation of a different
//! type collapses the column to TEXT permanently. An INTEGER/REAL mismatch is
//! treated exactly like a TEXT mismatch; there is no numeric promotion
//! lattice.

use crate::types::{ColumnSpec, FlatRow, SqlType};
use serde_json::Value;
use std::collections::HashMap;

/// Classify one scalar value. `None` means NULL: unknown, defer.
///
/// A number counts as INTEGER when it is a mathematical integer, so `1.0`
/// infers INTEGER even though it parses as a float. Booleans are stored as
/// 0/1 and therefore infer INTEGER.
pub fn type_of(value: &Value) -> Option<SqlType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(SqlType::Integer),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(SqlType::Integer)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => Some(SqlType::Integer),
                    _ => Some(SqlType::Real),
                }
            }
        }
        _ => Some(SqlType::Text),
    }
}

/// Merge two type observations for the same column.
///
/// NULL observations defer to whatever else is seen; conflicting non-null
/// observations collapse to TEXT.
pub fn merge(old: Option<SqlType>, new: Option<SqlType>) -> Option<SqlType> {
    match (old, new) {
        (None, observed) => observed,
        (known, None) => known,
        (Some(a), Some(b)) if a == b => Some(a),
        _ => Some(SqlType::Text),
    }
}

/// Accumulates per-column type observations across the sample.
#[derive(Debug, Default)]
pub struct TypeInferencer {
    /// Column names in first-seen order.
    order: Vec<String>,
    observed: HashMap<String, Option<SqlType>>,
}

impl TypeInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one flat row into the running per-column state.
    pub fn observe(&mut self, row: &FlatRow) {
        for (key, value) in row {
            let seen = type_of(value);
            match self.observed.get_mut(key) {
                Some(current) => *current = merge(*current, seen),
                None => {
                    self.order.push(key.clone());
                    self.observed.insert(key.clone(), seen);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Finalize the sample into an ordered column list.
    ///
    /// Columns that only ever held NULL fall back to TEXT.
    pub fn finalize(mut self) -> Vec<ColumnSpec> {
        self.order
            .drain(..)
            .map(|name| {
                let sql_type = self
                    .observed
                    .remove(&name)
                    .flatten()
                    .unwrap_or(SqlType::Text);
                ColumnSpec { name, sql_type }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn observe_all(inferencer: &mut TypeInferencer, objects: &[serde_json::Value]) {
        for obj in objects {
            let row = flatten(obj.as_object().unwrap());
            inferencer.observe(&row);
        }
    }

    #[test]
    fn test_type_of_scalars() {
        assert_eq!(type_of(&json!(null)), None);
        assert_eq!(type_of(&json!(1)), Some(SqlType::Integer));
        assert_eq!(type_of(&json!(-7)), Some(SqlType::Integer));
        assert_eq!(type_of(&json!(1.5)), Some(SqlType::Real));
        assert_eq!(type_of(&json!(true)), Some(SqlType::Integer));
        assert_eq!(type_of(&json!("x")), Some(SqlType::Text));
    }

    #[test]
    fn test_whole_float_is_integer() {
        // 1.0 has no fractional part, so it counts as a mathematical integer.
        assert_eq!(type_of(&json!(1.0)), Some(SqlType::Integer));
        assert_eq!(type_of(&json!(-3.0)), Some(SqlType::Integer));
    }

    #[test]
    fn test_merge_null_defers() {
        assert_eq!(merge(None, None), None);
        assert_eq!(merge(None, Some(SqlType::Integer)), Some(SqlType::Integer));
        assert_eq!(merge(Some(SqlType::Real), None), Some(SqlType::Real));
    }

    #[test]
    fn test_merge_agreement_keeps_type() {
        assert_eq!(
            merge(Some(SqlType::Integer), Some(SqlType::Integer)),
            Some(SqlType::Integer)
        );
    }

    #[test]
    fn test_merge_any_conflict_collapses_to_text() {
        // INTEGER/REAL is resolved exactly like TEXT conflicts: no promotion.
        assert_eq!(
            merge(Some(SqlType::Integer), Some(SqlType::Real)),
            Some(SqlType::Text)
        );
        assert_eq!(
            merge(Some(SqlType::Real), Some(SqlType::Integer)),
            Some(SqlType::Text)
        );
        assert_eq!(
            merge(Some(SqlType::Integer), Some(SqlType::Text)),
            Some(SqlType::Text)
        );
    }

    #[test]
    fn test_int_then_string_forces_text() {
        let mut inf = TypeInferencer::new();
        observe_all(&mut inf, &[json!({"v": 1}), json!({"v": "x"})]);
        let schema = inf.finalize();
        assert_eq!(schema, vec![ColumnSpec::new("v", SqlType::Text)]);
    }

    #[test]
    fn test_int_then_float_forces_text_not_real() {
        let mut inf = TypeInferencer::new();
        observe_all(&mut inf, &[json!({"v": 1}), json!({"v": 1.5})]);
        let schema = inf.finalize();
        assert_eq!(schema[0].sql_type, SqlType::Text);
    }

    #[test]
    fn test_all_null_column_defaults_to_text() {
        let mut inf = TypeInferencer::new();
        observe_all(&mut inf, &[json!({"v": null}), json!({"v": null})]);
        let schema = inf.finalize();
        assert_eq!(schema, vec![ColumnSpec::new("v", SqlType::Text)]);
    }

    #[test]
    fn test_null_then_value_takes_value_type() {
        let mut inf = TypeInferencer::new();
        observe_all(&mut inf, &[json!({"v": null}), json!({"v": 2.5})]);
        assert_eq!(inf.finalize()[0].sql_type, SqlType::Real);
    }

    #[test]
    fn test_columns_keep_first_seen_order() {
        let mut inf = TypeInferencer::new();
        observe_all(
            &mut inf,
            &[json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})],
        );
        let schema = inf.finalize();
        let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
