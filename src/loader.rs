//! Transactional batch loading.
//!
//! Rows buffer in arrival order and flush as one all-or-nothing unit: pending
//! column migrations first, then one prepared INSERT execution per row, inside
//! a single transaction. Grouping migrations with the inserts avoids a state
//! where a column exists but the rows that triggered its discovery were never
//! made durable, and avoids partial application of several new columns.

use crate::engine::{SqlEngine, SqlValue};
use crate::error::LoadError;
use crate::registry::SchemaRegistry;
use crate::types::{FlatRow, LoadEvent};
use serde_json::Value;

/// Convert one cell to a positional statement argument.
///
/// Missing keys and JSON nulls bind NULL; booleans bind 0/1. Arrays were
/// already serialized to JSON text by the flattener.
pub(crate) fn bind_value(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(u) = n.as_u64() {
                // Beyond i64 range; SQLite has no unsigned storage class.
                SqlValue::Real(u as f64)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

/// Buffers flat rows and writes them out in transactional batches.
#[derive(Debug, Default)]
pub struct BatchLoader {
    batch_size: usize,
    buffer: Vec<FlatRow>,
    total_rows: u64,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        BatchLoader {
            batch_size,
            buffer: Vec::new(),
            total_rows: 0,
        }
    }

    pub fn add(&mut self, row: FlatRow) {
        self.buffer.push(row);
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.batch_size
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Write the buffer (and any pending migrations) in one transaction.
    ///
    /// On any failure the transaction rolls back whole and the error is
    /// fatal to the run: the buffered rows are considered lost for this
    /// attempt and there is no automatic retry. An empty flush with nothing
    /// pending is a no-op.
    pub fn flush<E: SqlEngine>(
        &mut self,
        registry: &mut SchemaRegistry,
        engine: &mut E,
        events: &mut dyn FnMut(LoadEvent),
    ) -> Result<(), LoadError> {
        if self.buffer.is_empty() && registry.pending().is_empty() {
            return Ok(());
        }

        engine.begin()?;

        let migrated = registry.pending().to_vec();
        for spec in &migrated {
            let sql = registry.alter_table_sql(spec);
            if let Err(source) = engine.execute(&sql) {
                let _ = engine.rollback();
                return Err(LoadError::Migration {
                    column: spec.name.clone(),
                    source,
                });
            }
            // Only successfully executed migrations join the schema.
            registry.promote(spec.clone());
        }

        let insert_sql = registry.insert_sql();
        for row in &self.buffer {
            let params: Vec<SqlValue> = registry
                .columns()
                .iter()
                .map(|column| bind_value(row.get(&column.name)))
                .collect();
            if let Err(source) = engine.execute_with_params(&insert_sql, &params) {
                let _ = engine.rollback();
                return Err(LoadError::Insert(source));
            }
        }

        if let Err(source) = engine.commit() {
            let _ = engine.rollback();
            return Err(LoadError::Engine(source));
        }

        self.total_rows += self.buffer.len() as u64;
        self.buffer.clear();
        registry.clear_pending();

        for spec in migrated {
            events(LoadEvent::ColumnAdded {
                name: spec.name,
                sql_type: spec.sql_type,
            });
        }
        events(LoadEvent::Progress {
            total_rows: self.total_rows,
        });
        Ok(())
    }
}
