//! ingot-load: stream a JSON array of objects into a SQLite database file
//!
//! Usage:
//!   # Read from file, write out.db
//!   ingot-load data.json -o data.db
//!
//!   # Read from stdin
//!   curl -s https://api.example.com/items | ingot-load -o items.db
//!
//!   # Tune the table name, sampling and batching
//!   ingot-load events.json -o events.db --table events --sample-size 200 --batch-size 5000

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use ingot::{feed_reader, LoadConfig, LoadEvent, LoadSession, SqliteEngine};
use std::fs::File;
use std::io::{BufReader, Read};

#[derive(Parser, Debug)]
#[command(name = "ingot-load")]
#[command(about = "Stream a JSON array of objects into a SQLite database", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Output database file
    #[arg(long, short = 'o', default_value = "out.db")]
    output: String,

    /// Destination table name
    #[arg(long, default_value = "data")]
    table: String,

    /// Number of leading objects sampled to infer the schema
    #[arg(long, default_value_t = 100)]
    sample_size: usize,

    /// Rows committed per transaction
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Bytes read from the input per chunk
    #[arg(long, default_value_t = 65536)]
    chunk_size: usize,

    /// Suppress progress output on stderr
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let reader: Box<dyn Read> = if let Some(path) = &args.input {
        let file = File::open(path).with_context(|| format!("Failed to open input: {}", path))?;
        Box::new(BufReader::new(file))
    } else {
        Box::new(std::io::stdin())
    };

    let engine = SqliteEngine::in_memory().context("Failed to open in-memory database")?;
    let quiet = args.quiet;
    let mut session = LoadSession::with_observer(engine, move |event| {
        if quiet {
            return;
        }
        match event {
            LoadEvent::SchemaReady { table, columns, .. } => {
                eprintln!("table '{}' created with columns: {}", table, columns.join(", "));
            }
            LoadEvent::Progress { total_rows } => {
                eprintln!("  {} rows loaded", total_rows);
            }
            LoadEvent::ColumnAdded { name, sql_type } => {
                eprintln!("  added column '{}' {}", name, sql_type);
            }
            LoadEvent::ObjectSkipped { message } => {
                eprintln!("warning: skipped object: {}", message);
            }
            LoadEvent::ChunkDropped => {
                eprintln!("warning: dropped chunk delivered outside an active run");
            }
            LoadEvent::Completed {
                total_rows,
                export_bytes,
                skipped_objects,
            } => {
                eprintln!(
                    "done: {} rows, {} bytes exported, {} objects skipped",
                    total_rows, export_bytes, skipped_objects
                );
            }
        }
    });

    let config = LoadConfig {
        table_name: args.table,
        sample_size: args.sample_size,
        batch_size: args.batch_size,
    };
    session.start(config)?;
    feed_reader(&mut session, reader, args.chunk_size).context("Failed to read input")?;
    let image = session.finish().context("Conversion failed")?;

    std::fs::write(&args.output, &image)
        .with_context(|| format!("Failed to write output: {}", args.output))?;
    Ok(())
}
