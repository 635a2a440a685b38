//! Save cadence and persistence orchestration around a review session.
//!
//! Every decision bumps the session's action counter. Once it reaches the
//! configured interval the controller writes the snapshot, rebuilds and
//! writes the export, replicates the snapshot when a remote is configured,
//! and resets the counter. A forced save runs the same cycle immediately.
//!
//! Replicas are named after the dataset, which is the reviewed input file,
//! not the snapshot destination. Every session on the same input therefore
//! replaces the same remote artifact.

use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ReviewConfig;
use crate::decision::{HistoryEntry, Outcome};
use crate::error::{Result, ReviewError};
use crate::export;
use crate::id::RecordId;
use crate::record::Record;
use crate::replicate::{RemoteReplicator, ReplicationReport};
use crate::session::{Cursor, DecisionReceipt, ReviewCounts, ReviewSession};
use crate::snapshot::{self, PersistedSnapshot};
use crate::topic::KnownTopics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationStatus {
    Disabled,
    Replicated(ReplicationReport),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: PathBuf,
    pub rows: usize,
    pub export: PathBuf,
    pub bulleted: usize,
    pub replication: ReplicationStatus,
    pub saved_at: NaiveDateTime,
}

/// Result of a state-changing call plus the save cycle it triggered, if any.
///
/// The change itself has been applied whenever this is returned. A save
/// cycle that failed afterwards is reported in `save_error` so the receipt
/// is not lost.
#[derive(Debug)]
pub struct ActionOutcome<T> {
    pub value: T,
    pub cycle: Option<CycleReport>,
    pub save_error: Option<ReviewError>,
}

impl<T> ActionOutcome<T> {
    fn after(value: T, cycle: Result<Option<CycleReport>>) -> Self {
        match cycle {
            Ok(cycle) => Self {
                value,
                cycle,
                save_error: None,
            },
            Err(e) => {
                warn!("save after action failed: {}", e);
                Self {
                    value,
                    cycle: None,
                    save_error: Some(e),
                }
            }
        }
    }
}

pub struct SessionController {
    session: ReviewSession,
    destination: PathBuf,
    dataset: String,
    source: Option<PathBuf>,
    export_path: PathBuf,
    handle: String,
    save_interval: usize,
    replicator: Option<RemoteReplicator>,
    last_saved: Option<NaiveDateTime>,
}

impl SessionController {
    /// The dataset defaults to the destination's file name; use
    /// [`Self::with_source`] when reviewing a named input file.
    pub fn new(session: ReviewSession, destination: PathBuf, config: &ReviewConfig) -> Self {
        let dataset = file_name(&destination);
        Self {
            session,
            destination,
            dataset,
            source: None,
            export_path: config.export_path.clone(),
            handle: config.handle.clone(),
            save_interval: config.save_interval.max(1),
            replicator: config.remote.clone().map(RemoteReplicator::github),
            last_saved: None,
        }
    }

    /// Record the reviewed input file. Replicas are named after it
    /// (`tweets.csv` -> `tweets_autoPush.csv`) and one-off copies default to
    /// a timestamped name beside it.
    pub fn with_source(mut self, input: &Path) -> Self {
        let name = file_name(input);
        if !name.is_empty() {
            self.dataset = name;
        }
        self.source = Some(input.to_path_buf());
        self
    }

    pub fn with_replicator(mut self, replicator: Option<RemoteReplicator>) -> Self {
        self.replicator = replicator;
        self
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn decide(
        &mut self,
        id: &RecordId,
        outcome: Outcome,
        topic: Option<&str>,
    ) -> Result<ActionOutcome<DecisionReceipt>> {
        let value = self.session.decide(id, outcome, topic)?;
        let cycle = self.maybe_cycle();
        Ok(ActionOutcome::after(value, cycle))
    }

    pub fn decide_current(
        &mut self,
        outcome: Outcome,
        topic: Option<&str>,
    ) -> Result<ActionOutcome<DecisionReceipt>> {
        let value = self.session.decide_current(outcome, topic)?;
        let cycle = self.maybe_cycle();
        Ok(ActionOutcome::after(value, cycle))
    }

    pub fn undo(&mut self) -> Result<ActionOutcome<HistoryEntry>> {
        let value = self.session.undo()?;
        let cycle = self.maybe_cycle();
        Ok(ActionOutcome::after(value, cycle))
    }

    /// Clear every mark and persist the cleared state right away.
    pub fn reset_for_rereview(&mut self) -> Result<CycleReport> {
        self.session.reset_for_rereview();
        info!("session reset for re-review");
        self.run_cycle()
    }

    pub fn force_save(&mut self) -> Result<CycleReport> {
        self.run_cycle()
    }

    /// Change where the next snapshot goes. Blank names are ignored and
    /// already-written files are left alone.
    pub fn set_destination_name(&mut self, name: &str) -> &Path {
        if !name.trim().is_empty() {
            self.destination = snapshot::with_default_extension(name);
        }
        &self.destination
    }

    /// `reviewed_<stem>_<timestamp>.csv` beside the reviewed input.
    pub fn default_copy_path(&self) -> PathBuf {
        let base = self.source.as_deref().unwrap_or(self.destination.as_path());
        snapshot::default_destination(base, Local::now().naive_local())
    }

    /// Write a one-off reviewed copy without touching the cadence.
    pub fn export_copy(&self, name: &str) -> Result<PersistedSnapshot> {
        let path = snapshot::with_default_extension(name);
        snapshot::write(self.session.store(), &path)
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    pub fn save_interval(&self) -> usize {
        self.save_interval
    }

    pub fn replication_enabled(&self) -> bool {
        self.replicator.is_some()
    }

    pub fn last_saved(&self) -> Option<NaiveDateTime> {
        self.last_saved
    }

    pub fn cursor(&self) -> Cursor {
        self.session.cursor()
    }

    pub fn current(&self) -> Option<&Record> {
        self.session.current()
    }

    pub fn counts(&self) -> ReviewCounts {
        self.session.counts()
    }

    pub fn has_existing_review_marks(&self) -> bool {
        self.session.has_existing_review_marks()
    }

    pub fn known_topics(&self) -> &KnownTopics {
        self.session.known_topics()
    }

    pub fn action_count(&self) -> usize {
        self.session.action_count()
    }

    fn maybe_cycle(&mut self) -> Result<Option<CycleReport>> {
        if self.session.action_count() >= self.save_interval {
            self.run_cycle().map(Some)
        } else {
            Ok(None)
        }
    }

    fn run_cycle(&mut self) -> Result<CycleReport> {
        let persisted = snapshot::write(self.session.store(), &self.destination)?;

        let document = export::build(self.session.store(), &self.handle);
        document.write(&self.export_path)?;

        let replication = match &self.replicator {
            None => ReplicationStatus::Disabled,
            Some(replicator) => {
                match replicator.replicate(&persisted.bytes, &self.dataset, &self.dataset) {
                    Ok(report) => ReplicationStatus::Replicated(report),
                    Err(e) => {
                        warn!("{}", e);
                        ReplicationStatus::Failed(e.to_string())
                    }
                }
            }
        };

        self.session.reset_action_count();
        let saved_at = Local::now().naive_local();
        self.last_saved = Some(saved_at);
        info!(
            "saved {} records to {} and {} bullets to {}",
            persisted.rows,
            persisted.path.display(),
            document.entry_count(),
            self.export_path.display()
        );

        Ok(CycleReport {
            snapshot: persisted.path,
            rows: persisted.rows,
            export: self.export_path.clone(),
            bulleted: document.entry_count(),
            replication,
            saved_at,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
