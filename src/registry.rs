//! Authoritative schema state for one conversion run.
//!
//! The registry starts out sampling (accumulating type observations, no table
//! yet), materializes the base schema exactly once, and from then on queues
//! newly discovered columns until the loader migrates them inside its next
//! flush. The ordered column list and the name-membership set are kept
//! consistent at all times; names enter the membership set the moment they are
//! first seen, even before their ALTER TABLE has executed, so "is known"
//! checks stay idempotent across rows and batches.

use crate::error::LoadError;
use crate::infer::{type_of, TypeInferencer};
use crate::types::{ColumnSpec, FlatRow, SqlType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IDENT_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Reduce an arbitrary key path to a safe SQL identifier.
///
/// Allow-listed characters pass through; everything else becomes `_`, and a
/// leading digit (or an empty result) gains a `_` prefix. This transform is
/// applied only when emitting SQL text; canonical names stay untouched for
/// lookups. Values are never interpolated into SQL, only bound positionally.
pub fn sanitize_identifier(name: &str) -> String {
    let cleaned = IDENT_DISALLOWED.replace_all(name, "_").into_owned();
    match cleaned.chars().next() {
        None => String::from("_"),
        Some(c) if c.is_ascii_digit() => format!("_{}", cleaned),
        _ => cleaned,
    }
}

/// Schema state machine: sampling, then materialized with a growable tail.
#[derive(Debug)]
pub struct SchemaRegistry {
    table: String,
    sample_size: usize,
    sampled: usize,
    /// Present while sampling; consumed by materialization.
    inferencer: Option<TypeInferencer>,
    /// Authoritative ordered column list. Frozen base plus migrated tail;
    /// existing entries never change type once the table exists.
    columns: Vec<ColumnSpec>,
    /// Every canonical name ever admitted, for O(1) membership checks.
    known: HashSet<String>,
    /// Columns discovered after materialization, awaiting ALTER TABLE.
    pending: Vec<ColumnSpec>,
}

impl SchemaRegistry {
    pub fn new(table: impl Into<String>, sample_size: usize) -> Self {
        SchemaRegistry {
            table: table.into(),
            sample_size,
            sampled: 0,
            inferencer: Some(TypeInferencer::new()),
            columns: Vec::new(),
            known: HashSet::new(),
            pending: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_materialized(&self) -> bool {
        self.inferencer.is_none()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn pending(&self) -> &[ColumnSpec] {
        &self.pending
    }

    /// Feed one row to the sampling inferencer. Returns true once the sample
    /// is complete and the table should be materialized.
    pub fn observe_sample(&mut self, row: &FlatRow) -> bool {
        if let Some(inferencer) = self.inferencer.as_mut() {
            inferencer.observe(row);
            self.sampled += 1;
        }
        self.sampled >= self.sample_size
    }

    /// Finalize the sampled schema and emit the CREATE TABLE statement.
    ///
    /// Fires either when the sample count reaches the threshold or at stream
    /// end for a short stream. A sample with zero discoverable columns is
    /// fatal to the run.
    pub fn materialize(&mut self) -> Result<String, LoadError> {
        let inferencer = self
            .inferencer
            .take()
            .ok_or(LoadError::Session("table already materialized"))?;
        let columns = inferencer.finalize();
        if columns.is_empty() {
            return Err(LoadError::EmptySchema);
        }

        self.known = columns.iter().map(|c| c.name.clone()).collect();
        self.columns = columns;
        Ok(self.create_table_sql())
    }

    /// Queue every previously-unseen key of `row` for migration.
    ///
    /// New columns take a one-shot type guess from the single value in hand
    /// (a NULL guesses TEXT); later conflicting values for the same column
    /// insert under that first guess with whatever coercion the engine
    /// applies. The name joins the membership set immediately so the same key
    /// is never queued twice.
    pub fn discover(&mut self, row: &FlatRow) {
        for (key, value) in row {
            if self.known.contains(key) {
                continue;
            }
            self.known.insert(key.clone());
            let sql_type = type_of(value).unwrap_or(SqlType::Text);
            self.pending.push(ColumnSpec::new(key.clone(), sql_type));
        }
    }

    /// Append a successfully migrated column to the authoritative schema.
    pub fn promote(&mut self, spec: ColumnSpec) {
        self.columns.push(spec);
    }

    /// Drop the queue after the flush that migrated it has committed.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn create_table_sql(&self) -> String {
        let defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", sanitize_identifier(&c.name), c.sql_type))
            .collect();
        format!(
            "CREATE TABLE \"{}\" ({})",
            sanitize_identifier(&self.table),
            defs.join(", ")
        )
    }

    pub fn alter_table_sql(&self, spec: &ColumnSpec) -> String {
        format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            sanitize_identifier(&self.table),
            sanitize_identifier(&spec.name),
            spec.sql_type
        )
    }

    /// Parameterized INSERT over the current column order.
    pub fn insert_sql(&self) -> String {
        let names: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\"{}\"", sanitize_identifier(&c.name)))
            .collect();
        let placeholders: Vec<&str> = self.columns.iter().map(|_| "?").collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            sanitize_identifier(&self.table),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn row(value: serde_json::Value) -> FlatRow {
        flatten(value.as_object().unwrap())
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("plain_name"), "plain_name");
        assert_eq!(sanitize_identifier("user.email"), "user_email");
        assert_eq!(sanitize_identifier("weird key!"), "weird_key_");
        assert_eq!(sanitize_identifier("9lives"), "_9lives");
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("a\"; DROP TABLE x; --"), "a___DROP_TABLE_x____");
    }

    #[test]
    fn test_sample_completion_threshold() {
        let mut registry = SchemaRegistry::new("data", 2);
        assert!(!registry.observe_sample(&row(json!({"a": 1}))));
        assert!(registry.observe_sample(&row(json!({"a": 2}))));
    }

    #[test]
    fn test_materialize_builds_ddl() {
        let mut registry = SchemaRegistry::new("data", 2);
        registry.observe_sample(&row(json!({"id": 1, "name": "a"})));
        registry.observe_sample(&row(json!({"id": 2, "name": "b"})));
        let ddl = registry.materialize().unwrap();
        assert_eq!(ddl, "CREATE TABLE \"data\" (\"id\" INTEGER, \"name\" TEXT)");
        assert!(registry.is_materialized());
        assert_eq!(registry.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_materialize_twice_is_an_error() {
        let mut registry = SchemaRegistry::new("data", 1);
        registry.observe_sample(&row(json!({"a": 1})));
        registry.materialize().unwrap();
        assert!(matches!(
            registry.materialize(),
            Err(LoadError::Session(_))
        ));
    }

    #[test]
    fn test_empty_sample_is_fatal() {
        let mut registry = SchemaRegistry::new("data", 5);
        assert!(matches!(registry.materialize(), Err(LoadError::EmptySchema)));
    }

    #[test]
    fn test_discover_queues_each_name_once() {
        let mut registry = SchemaRegistry::new("data", 1);
        registry.observe_sample(&row(json!({"a": 1})));
        registry.materialize().unwrap();

        registry.discover(&row(json!({"a": 1, "extra": "x"})));
        registry.discover(&row(json!({"extra": "y", "more": 2.5})));

        let pending = registry.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0], ColumnSpec::new("extra", SqlType::Text));
        assert_eq!(pending[1], ColumnSpec::new("more", SqlType::Real));
    }

    #[test]
    fn test_discover_null_guesses_text() {
        let mut registry = SchemaRegistry::new("data", 1);
        registry.observe_sample(&row(json!({"a": 1})));
        registry.materialize().unwrap();

        registry.discover(&row(json!({"ghost": null})));
        assert_eq!(registry.pending()[0].sql_type, SqlType::Text);
    }

    #[test]
    fn test_first_sighting_wins_for_new_columns() {
        let mut registry = SchemaRegistry::new("data", 1);
        registry.observe_sample(&row(json!({"a": 1})));
        registry.materialize().unwrap();

        registry.discover(&row(json!({"n": 7})));
        registry.discover(&row(json!({"n": "conflicting"})));

        // No sample-wide resolution after materialization: the first guess holds.
        assert_eq!(registry.pending().len(), 1);
        assert_eq!(registry.pending()[0].sql_type, SqlType::Integer);
    }

    #[test]
    fn test_promote_extends_insert_order() {
        let mut registry = SchemaRegistry::new("data", 1);
        registry.observe_sample(&row(json!({"a": 1})));
        registry.materialize().unwrap();
        registry.promote(ColumnSpec::new("b", SqlType::Text));

        assert_eq!(
            registry.insert_sql(),
            "INSERT INTO \"data\" (\"a\", \"b\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_alter_table_sql() {
        let mut registry = SchemaRegistry::new("my table", 1);
        registry.observe_sample(&row(json!({"a": 1})));
        registry.materialize().unwrap();
        let sql = registry.alter_table_sql(&ColumnSpec::new("user.name", SqlType::Text));
        assert_eq!(sql, "ALTER TABLE \"my_table\" ADD COLUMN \"user_name\" TEXT");
    }
}
