//! The narrow command seam to the relational engine.
//!
//! The core only ever needs four capabilities: run DDL/DML text, run one
//! prepared statement with positional arguments, control a transaction, and
//! export the whole database as bytes. Keeping this behind a trait lets tests
//! inject failures at any step without SQLite's cooperation.

use crate::error::EngineError;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// A positional statement argument.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::from(rusqlite::types::Null),
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
            SqlValue::Real(f) => ToSqlOutput::from(*f),
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Everything the loader requires of a relational engine.
///
/// Transaction control defaults to plain BEGIN/COMMIT/ROLLBACK statements so
/// an implementation only has to provide `execute`, `execute_with_params` and
/// `export`.
pub trait SqlEngine {
    /// Execute one or more statements of SQL text.
    fn execute(&mut self, sql: &str) -> Result<(), EngineError>;

    /// Prepare `sql` (cached where possible) and run it once with positional
    /// arguments.
    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), EngineError>;

    /// Serialize the full database into a standalone file image.
    fn export(&mut self) -> Result<Vec<u8>, EngineError>;

    fn begin(&mut self) -> Result<(), EngineError> {
        self.execute("BEGIN")
    }

    fn commit(&mut self) -> Result<(), EngineError> {
        self.execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), EngineError> {
        self.execute("ROLLBACK")
    }
}

static EXPORT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Production engine over an in-process SQLite database.
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    pub fn in_memory() -> Result<Self, EngineError> {
        Ok(SqliteEngine {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Ok(SqliteEngine {
            conn: Connection::open(path)?,
        })
    }

    /// Direct access to the underlying connection, mainly for inspection in
    /// tests and tooling.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SqlEngine for SqliteEngine {
    fn execute(&mut self, sql: &str) -> Result<(), EngineError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), EngineError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        stmt.execute(params_from_iter(params.iter()))?;
        Ok(())
    }

    /// Export via `VACUUM INTO` a uniquely named temp file, read back and
    /// removed. VACUUM cannot run inside a transaction, so this must only be
    /// called between flushes.
    fn export(&mut self) -> Result<Vec<u8>, EngineError> {
        let path = std::env::temp_dir().join(format!(
            "ingot-export-{}-{}.db",
            std::process::id(),
            EXPORT_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let target = path.to_string_lossy().into_owned();
        self.conn.execute("VACUUM INTO ?1", [target.as_str()])?;
        let bytes = std::fs::read(&path)?;
        let _ = std::fs::remove_file(&path);
        Ok(bytes)
    }
}
