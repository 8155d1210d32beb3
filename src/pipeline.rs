//! The conversion-run controller.
//!
//! One `LoadSession` drives one run end-to-end: chunks in, scanner, per-object
//! parse, flatten, sample-or-load routing, migrations, batched flushes, final
//! export. Processing is strictly sequential per chunk and control returns to
//! the host after every call, so backpressure and cancellation stay host
//! concerns. All mutable run state lives in the session; a fresh run needs a
//! fresh session.

use crate::engine::SqlEngine;
use crate::error::LoadError;
use crate::flatten::flatten;
use crate::loader::BatchLoader;
use crate::registry::SchemaRegistry;
use crate::scanner::ObjectScanner;
use crate::types::{LoadConfig, LoadEvent};
use serde_json::Value;

type Observer = Box<dyn FnMut(LoadEvent)>;

/// Mutable state of one active run.
struct RunState {
    scanner: ObjectScanner,
    registry: SchemaRegistry,
    loader: BatchLoader,
    skipped: u64,
}

/// Orchestrates one conversion run against a SQL engine.
pub struct LoadSession<E: SqlEngine> {
    engine: E,
    observer: Observer,
    run: Option<RunState>,
    finished: bool,
}

impl<E: SqlEngine> LoadSession<E> {
    pub fn new(engine: E) -> Self {
        LoadSession {
            engine,
            observer: Box::new(|_| {}),
            run: None,
            finished: false,
        }
    }

    /// Like `new`, but every lifecycle and progress event is delivered to
    /// `observer` as it happens.
    pub fn with_observer(engine: E, observer: impl FnMut(LoadEvent) + 'static) -> Self {
        LoadSession {
            engine,
            observer: Box::new(observer),
            run: None,
            finished: false,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Accept configuration and open the run. Must be called exactly once,
    /// before any chunk.
    pub fn start(&mut self, config: LoadConfig) -> Result<(), LoadError> {
        if self.finished {
            return Err(LoadError::Session("session already finished"));
        }
        if self.run.is_some() {
            return Err(LoadError::Session("run already started"));
        }
        if config.sample_size == 0 || config.batch_size == 0 {
            return Err(LoadError::Session(
                "sample_size and batch_size must be positive",
            ));
        }

        self.run = Some(RunState {
            scanner: ObjectScanner::new(),
            registry: SchemaRegistry::new(config.table_name, config.sample_size),
            loader: BatchLoader::new(config.batch_size),
            skipped: 0,
        });
        Ok(())
    }

    /// Feed one chunk of the JSON document, in arrival order.
    ///
    /// A chunk delivered outside an active run is dropped with a warning
    /// event (caller error, not recoverable by buffering). A fatal error
    /// discards the run's state; the host decides whether to retry from the
    /// beginning with a fresh session.
    pub fn feed_chunk(&mut self, chunk: &str) -> Result<(), LoadError> {
        let Some(mut run) = self.run.take() else {
            (self.observer)(LoadEvent::ChunkDropped);
            return Ok(());
        };

        let result = self.ingest(&mut run, chunk);
        if result.is_ok() {
            self.run = Some(run);
        }
        result
    }

    fn ingest(&mut self, run: &mut RunState, chunk: &str) -> Result<(), LoadError> {
        for text in run.scanner.feed(chunk) {
            // The scanner guarantees brace balance, not well-formedness; a
            // text that fails to parse is skipped, never fatal.
            let mut bytes = text.into_bytes();
            let value: Value = match simd_json::serde::from_slice(&mut bytes) {
                Ok(value) => value,
                Err(err) => {
                    run.skipped += 1;
                    (self.observer)(LoadEvent::ObjectSkipped {
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            let Value::Object(object) = value else {
                run.skipped += 1;
                (self.observer)(LoadEvent::ObjectSkipped {
                    message: String::from("scanned value is not an object"),
                });
                continue;
            };

            let row = flatten(&object);
            if run.registry.is_materialized() {
                run.registry.discover(&row);
                run.loader.add(row);
            } else {
                let sample_complete = run.registry.observe_sample(&row);
                run.loader.add(row);
                if sample_complete {
                    self.materialize(run)?;
                }
            }

            // Auto-flush only once the table exists; with a batch size below
            // the sample size the buffer simply runs past the threshold until
            // materialization.
            if run.registry.is_materialized() && run.loader.is_full() {
                run.loader
                    .flush(&mut run.registry, &mut self.engine, &mut *self.observer)?;
            }
        }
        Ok(())
    }

    fn materialize(&mut self, run: &mut RunState) -> Result<(), LoadError> {
        let ddl = run.registry.materialize()?;
        self.engine.execute(&ddl)?;
        (self.observer)(LoadEvent::SchemaReady {
            table: run.registry.table().to_string(),
            columns: run.registry.column_names(),
            ddl,
        });
        Ok(())
    }

    /// End of stream: materialize short streams, flush the remainder, export.
    ///
    /// Returns the engine's serialized database image and emits the
    /// completion report. The session cannot be restarted afterwards.
    pub fn finish(&mut self) -> Result<Vec<u8>, LoadError> {
        let mut run = self
            .run
            .take()
            .ok_or(LoadError::Session("no active run to finish"))?;
        self.finished = true;

        if let Err(err) = run.scanner.finish() {
            // The trailing partial object was never parsable; report and move
            // on to the final flush.
            run.skipped += 1;
            (self.observer)(LoadEvent::ObjectSkipped {
                message: err.to_string(),
            });
        }

        // A stream shorter than the sample still yields a usable schema.
        if !run.registry.is_materialized() {
            self.materialize(&mut run)?;
        }

        run.loader
            .flush(&mut run.registry, &mut self.engine, &mut *self.observer)?;

        let bytes = self.engine.export().map_err(LoadError::Export)?;
        (self.observer)(LoadEvent::Completed {
            total_rows: run.loader.total_rows(),
            export_bytes: bytes.len() as u64,
            skipped_objects: run.skipped,
        });
        Ok(bytes)
    }

    /// Snapshot the database at any time after table materialization.
    pub fn export(&mut self) -> Result<Vec<u8>, LoadError> {
        let materialized = match &self.run {
            Some(run) => run.registry.is_materialized(),
            None => self.finished,
        };
        if !materialized {
            return Err(LoadError::Session("table not yet materialized"));
        }
        self.engine.export().map_err(LoadError::Export)
    }
}
