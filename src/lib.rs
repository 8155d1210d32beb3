//! # Ingot - Streaming JSON to SQLite Loader
//!
//! Ingot turns a JSON array of objects, delivered as arbitrary text chunks,
//! into a SQLite table without ever holding the whole document in memory. It
//! scans object boundaries incrementally, flattens nested structure into flat
//! rows, infers a relational schema from a bounded sample of leading objects,
//! and writes rows in transactional batches. Fields that first appear after
//! the table exists are added with `ALTER TABLE` on the next flush, and the
//! engine backfills NULL for all earlier rows.
//!
//! ## Modules
//!
//! - **scanner**: find complete top-level objects in a chunked text stream
//! - **flatten**: collapse nested objects into underscore-joined key paths
//! - **infer**: sample-based SQL type inference with conservative merging
//! - **registry**: the authoritative, evolving column schema
//! - **loader**: transactional batch writes with in-flush migrations
//! - **pipeline**: the session driving one conversion run end-to-end
//! - **engine**: the narrow command seam to SQLite
//!
//! ## Quick Start
//!
//! ```rust
//! use ingot::{load_json, LoadConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let input = r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#;
//!
//! let db_image = load_json(input.as_bytes(), LoadConfig::default())?;
//!
//! // db_image is a complete SQLite database file holding table "data"
//! // with columns id INTEGER, name TEXT and two rows.
//! assert!(db_image.starts_with(b"SQLite format 3"));
//! # Ok(())
//! # }
//! ```
//!
//! For incremental delivery, progress events, or a file-backed database, use
//! [`LoadSession`] directly.

use std::io::Read;

pub mod engine;
pub mod error;
pub mod flatten;
pub mod infer;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod scanner;
pub mod types;

// Re-export commonly used types for convenience
pub use engine::{SqlEngine, SqlValue, SqliteEngine};
pub use error::{EngineError, LoadError, ScanError};
pub use flatten::flatten;
pub use infer::TypeInferencer;
pub use loader::BatchLoader;
pub use pipeline::LoadSession;
pub use registry::SchemaRegistry;
pub use scanner::ObjectScanner;
pub use types::{ColumnSpec, FlatRow, LoadConfig, LoadEvent, SqlType};

/// Feed a reader into an already-started session in fixed-size chunks.
///
/// Reads are split on byte boundaries, so a multibyte character may straddle
/// two reads; the incomplete trailing sequence is held back and prepended to
/// the next chunk. Genuinely invalid UTF-8 is an error.
pub fn feed_reader<R: Read, E: SqlEngine>(
    session: &mut LoadSession<E>,
    mut reader: R,
    chunk_size: usize,
) -> Result<(), LoadError> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut carry: Vec<u8> = Vec::new();

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        carry.extend_from_slice(&buf[..n]);

        match std::str::from_utf8(&carry) {
            Ok(text) => {
                session.feed_chunk(text)?;
                carry.clear();
            }
            Err(err) if err.error_len().is_none() => {
                // Incomplete trailing character; feed the valid prefix.
                let valid = err.valid_up_to();
                if valid > 0 {
                    let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
                    session.feed_chunk(&text)?;
                    carry.drain(..valid);
                }
            }
            Err(_) => {
                return Err(LoadError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "input is not valid UTF-8",
                )));
            }
        }
    }

    if !carry.is_empty() {
        return Err(LoadError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "input ended inside a multibyte character",
        )));
    }
    Ok(())
}

/// Main entry point: load a JSON array of objects into an in-memory SQLite
/// database and return its serialized file image.
pub fn load_json<R: Read>(reader: R, config: LoadConfig) -> Result<Vec<u8>, LoadError> {
    let engine = SqliteEngine::in_memory()?;
    let mut session = LoadSession::new(engine);
    session.start(config)?;
    feed_reader(&mut session, reader, 64 * 1024)?;
    session.finish()
}
