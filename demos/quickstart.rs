//! Quickstart: stream a small JSON array into SQLite and watch the events.
//!
//! Run with: cargo run --example quickstart

use ingot::{LoadConfig, LoadEvent, LoadSession, SqliteEngine};

fn main() -> anyhow::Result<()> {
    let input = r#"[
        {"id": 1, "name": "Alice", "address": {"city": "Oslo", "zip": "0150"}},
        {"id": 2, "name": "Bob", "tags": ["admin", "ops"]},
        {"id": 3, "name": "Carol", "address": {"city": "Bergen"}, "score": 9.5}
    ]"#;

    let engine = SqliteEngine::in_memory()?;
    let mut session = LoadSession::with_observer(engine, |event| match event {
        LoadEvent::SchemaReady { ddl, .. } => println!("schema: {}", ddl),
        LoadEvent::Progress { total_rows } => println!("loaded {} rows", total_rows),
        LoadEvent::ColumnAdded { name, sql_type } => {
            println!("new column: {} {}", name, sql_type)
        }
        other => println!("{:?}", other),
    });

    session.start(LoadConfig {
        sample_size: 2, // small sample so the third object arrives post-schema
        ..LoadConfig::default()
    })?;

    // Chunks may split the document anywhere, even inside a string.
    for chunk in input.as_bytes().chunks(24) {
        session.feed_chunk(std::str::from_utf8(chunk)?)?;
    }

    let image = session.finish()?;
    println!("exported {} bytes", image.len());
    Ok(())
}
