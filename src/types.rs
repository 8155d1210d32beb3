use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A flattened record: underscored key paths mapped to scalar JSON values.
///
/// Keys are unique by construction (flattening always produces distinct paths)
/// and keep first-seen order thanks to serde_json's `preserve_order` feature.
pub type FlatRow = Map<String, Value>;

/// The three storage classes the loader distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::Real => write!(f, "REAL"),
            SqlType::Text => write!(f, "TEXT"),
        }
    }
}

/// One column of the inferred schema.
///
/// `name` is the canonical flattened key path. SQL-identifier sanitization is a
/// presentation transform applied only when emitting DDL/DML; lookups always
/// use the canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        ColumnSpec {
            name: name.into(),
            sql_type,
        }
    }
}

/// Configuration for one conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Name of the destination table
    pub table_name: String,

    /// Number of leading objects used to infer the base schema
    pub sample_size: usize,

    /// Number of buffered rows per transactional flush
    pub batch_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            table_name: String::from("data"),
            sample_size: 100,
            batch_size: 1000,
        }
    }
}

/// Lifecycle and progress notifications delivered to the host's observer.
#[derive(Debug, Clone, Serialize)]
pub enum LoadEvent {
    /// The base schema was finalized and the table created.
    SchemaReady {
        table: String,
        columns: Vec<String>,
        ddl: String,
    },

    /// A batch committed; `total_rows` is cumulative.
    Progress { total_rows: u64 },

    /// A previously-unseen field was migrated into the table.
    ColumnAdded { name: String, sql_type: SqlType },

    /// A scanned object failed to parse and was skipped.
    ObjectSkipped { message: String },

    /// A chunk arrived outside an active run and was dropped.
    ChunkDropped,

    /// The run finished; the exported snapshot is `export_bytes` long.
    Completed {
        total_rows: u64,
        export_bytes: u64,
        skipped_objects: u64,
    },
}
