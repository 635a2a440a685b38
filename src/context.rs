use anyhow::{Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};

use crate::record::{LoadReport, RecordStore};
use crate::snapshot::SNAPSHOT_EXTENSION;
use crate::table::Table;

/// Directory the reviewer works in: input tables are discovered here and
/// relative names resolve against it.
pub struct ReviewContext {
    pub root: PathBuf,
}

impl ReviewContext {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn current() -> Result<Self> {
        let root = std::env::current_dir().context("Failed to read working directory")?;
        Ok(Self::new(root))
    }

    /// Tabular files directly under the root, sorted by path.
    pub fn list_tables(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/*.{}",
            Pattern::escape(&self.root.to_string_lossy()),
            SNAPSHOT_EXTENSION
        );
        let options = MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let mut files = Vec::new();
        for entry in glob_with(&pattern, options)
            .with_context(|| format!("Invalid table pattern {:?}", pattern))?
        {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn open_store(&self, path: &Path) -> Result<(RecordStore, LoadReport)> {
        let path = self.resolve(path);
        let table =
            Table::read_path(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let loaded =
            RecordStore::load(table).with_context(|| format!("Failed to load {:?}", path))?;
        Ok(loaded)
    }
}
