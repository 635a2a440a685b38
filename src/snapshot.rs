//! Durable tabular snapshots of the record store.

use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Result, ReviewError};
use crate::record::{RecordStore, REVIEWED_COLUMN, TOPIC_COLUMN};
use crate::table::Table;

pub const SNAPSHOT_EXTENSION: &str = "csv";

/// A snapshot that reached disk. `bytes` is exactly what was written, so it
/// can be handed to replication without re-reading the file.
#[derive(Debug, Clone)]
pub struct PersistedSnapshot {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

/// Project the store back into its input shape, with the review columns
/// filled from session state. Every record is included, reviewed or not.
pub fn to_table(store: &RecordStore) -> Table {
    let mut table = Table::new(store.headers().to_vec());
    let reviewed_col = table.ensure_column(REVIEWED_COLUMN);
    let topic_col = table.ensure_column(TOPIC_COLUMN);

    for record in store.iter() {
        let mut row = record.cells().to_vec();
        row.resize(table.headers.len(), String::new());
        row[reviewed_col] = record.status().as_cell().to_string();
        row[topic_col] = record
            .topic()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default();
        table.push_row(row);
    }
    table
}

/// Serialize the store and replace `destination` atomically.
pub fn write(store: &RecordStore, destination: &Path) -> Result<PersistedSnapshot> {
    let table = to_table(store);
    let bytes = table.to_csv_bytes()?;
    write_atomic(destination, &bytes)?;
    info!(
        "wrote snapshot of {} records to {}",
        table.len(),
        destination.display()
    );
    Ok(PersistedSnapshot {
        path: destination.to_path_buf(),
        bytes,
        rows: table.len(),
    })
}

/// Write `bytes` to a sibling temp file, sync it, then rename it over `path`.
/// A failure at any step leaves the previous file in place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let persistence = |reason: String| ReviewError::Persistence {
        path: path.to_path_buf(),
        reason,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| persistence(e.to_string()))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| persistence(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| persistence(e.error.to_string()))?;
    Ok(())
}

/// `reviewed_<stem>_<YYYYmmdd_HHMMSS>.csv` next to the input file.
pub fn default_destination(input: &Path, now: NaiveDateTime) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());
    let name = format!(
        "reviewed_{}_{}.{}",
        stem,
        now.format("%Y%m%d_%H%M%S"),
        SNAPSHOT_EXTENSION
    );
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Add the snapshot extension when the reviewer typed a bare name.
pub fn with_default_extension(name: &str) -> PathBuf {
    let path = PathBuf::from(name.trim());
    if path.extension().is_none() {
        path.with_extension(SNAPSHOT_EXTENSION)
    } else {
        path
    }
}
