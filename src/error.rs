use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::id::RecordId;
use crate::record::ReviewStatus;

/// Errors raised by the review core.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("cannot load records: {0}")]
    Load(String),
    #[error("record {id} is already {status} and cannot be decided again")]
    InvalidTransition { id: RecordId, status: ReviewStatus },
    #[error("all records have been reviewed")]
    Exhausted,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("a bullet requires a non-empty topic")]
    EmptyTopic,
    #[error("no record with id {0}")]
    UnknownRecord(RecordId),
    #[error("failed to persist {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
    #[error("remote replication failed: {0}")]
    Replication(String),
    #[error("table error: {0}")]
    Table(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = ReviewError> = std::result::Result<T, E>;
