//! Output formatting and persistence for aggregation results.
//!
//! Supports pretty-printing, JSON files (or stdout) and CSV files.

use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Writes `value` as pretty-printed JSON to `path`, or to stdout when no
/// path is given.
pub fn write_json(path: Option<&str>, value: &impl Serialize) -> Result<()> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            info!(path, "JSON written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)?;
            lock.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Writes rows as CSV with a header line, replacing any existing file.
/// Writes to stdout when no path is given.
pub fn write_csv<T: Serialize>(path: Option<&str>, rows: &[T]) -> Result<()> {
    match path {
        Some(path) => {
            let mut writer = csv::Writer::from_writer(create(path)?);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
            info!(path, rows = rows.len(), "CSV written");
        }
        None => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn create(path: &str) -> Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}
