use thiserror::Error;

/// Failure raised by the SQL engine seam.
///
/// Carries only a message so mock engines in tests can fabricate failures
/// without depending on SQLite error codes.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError(err.to_string())
    }
}

/// Scanner-level failure: input ended while a top-level object was still open.
#[derive(Debug, Error)]
#[error("input ended inside an open object ({buffered} buffered bytes)")]
pub struct ScanError {
    pub buffered: usize,
}

/// Run-level error taxonomy.
///
/// Per-object parse failures are not errors at this level; they surface as
/// `LoadEvent::ObjectSkipped` warnings and the run continues.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The sample (or the entire short stream) yielded zero columns.
    #[error("sample produced no columns; refusing to create an empty table")]
    EmptySchema,

    /// An ALTER TABLE inside a flush failed; the whole flush was rolled back.
    #[error("schema migration failed for column '{column}': {source}")]
    Migration {
        column: String,
        source: EngineError,
    },

    /// A row insert inside a flush failed; the whole flush was rolled back.
    #[error("batch insert failed: {0}")]
    Insert(EngineError),

    /// The engine could not serialize its state.
    #[error("database export failed: {0}")]
    Export(EngineError),

    /// Table creation or transaction control failed outside a flush step.
    #[error("database engine error: {0}")]
    Engine(#[from] EngineError),

    /// The session was driven out of order (start twice, finish before start, ...).
    #[error("invalid session state: {0}")]
    Session(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
