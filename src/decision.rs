use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::RecordId;
use crate::record::Mark;

/// A reviewer's verdict on one record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Bullet,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Bullet => write!(f, "bullet"),
        }
    }
}

/// An applied decision, kept so it can be undone. `previous` is the mark the
/// record carried before the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub record: RecordId,
    pub outcome: Outcome,
    pub previous: Mark,
}
