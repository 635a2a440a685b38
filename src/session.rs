//! Review session state machine.
//!
//! The session is the only mutator of review marks. Every decision is pushed
//! onto an undo stack and counted toward the save cadence; undo pops the
//! stack but never rewinds the counter.

use tracing::{debug, warn};

use crate::decision::{HistoryEntry, Outcome};
use crate::error::{Result, ReviewError};
use crate::id::RecordId;
use crate::record::{Mark, Record, RecordStore, ReviewStatus};
use crate::topic::{KnownTopics, Topic, TopicNotice};

/// Position of the record currently presented to the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    At(usize),
    Exhausted,
}

impl Cursor {
    pub fn index(&self) -> Option<usize> {
        match self {
            Cursor::At(i) => Some(*i),
            Cursor::Exhausted => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewCounts {
    pub passed: usize,
    pub bulleted: usize,
    pub total: usize,
}

impl ReviewCounts {
    pub fn reviewed(&self) -> usize {
        self.passed + self.bulleted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionReceipt {
    pub index: usize,
    pub notice: Option<TopicNotice>,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    store: RecordStore,
    cursor: Cursor,
    history: Vec<HistoryEntry>,
    action_count: usize,
    known_topics: KnownTopics,
}

impl ReviewSession {
    pub fn new(store: RecordStore) -> Self {
        let mut known_topics = KnownTopics::default();
        for topic in store.iter().filter_map(Record::topic) {
            known_topics.insert(topic.clone());
        }
        let cursor = match store.next_unreviewed(0) {
            Some(i) => Cursor::At(i),
            None => Cursor::Exhausted,
        };
        Self {
            store,
            cursor,
            history: Vec::new(),
            action_count: 0,
            known_topics,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn current(&self) -> Option<&Record> {
        self.cursor.index().and_then(|i| self.store.get(i))
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Decisions applied since the last save boundary.
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub(crate) fn reset_action_count(&mut self) {
        self.action_count = 0;
    }

    pub fn known_topics(&self) -> &KnownTopics {
        &self.known_topics
    }

    pub fn counts(&self) -> ReviewCounts {
        ReviewCounts {
            passed: self.store.count(ReviewStatus::Passed),
            bulleted: self.store.count(ReviewStatus::Bulleted),
            total: self.store.len(),
        }
    }

    pub fn has_existing_review_marks(&self) -> bool {
        self.store.has_review_marks()
    }

    /// Apply a decision to an unreviewed record and move on to the next
    /// unreviewed one. On error the session is left untouched.
    pub fn decide(
        &mut self,
        id: &RecordId,
        outcome: Outcome,
        topic: Option<&str>,
    ) -> Result<DecisionReceipt> {
        let index = self
            .store
            .position(id)
            .ok_or_else(|| ReviewError::UnknownRecord(id.clone()))?;
        let record = &self.store.records()[index];
        if record.status() != ReviewStatus::Unreviewed {
            return Err(ReviewError::InvalidTransition {
                id: id.clone(),
                status: record.status(),
            });
        }

        let (mark, notice) = match outcome {
            Outcome::Pass => (Mark::Passed, None),
            Outcome::Bullet => {
                let raw = topic.unwrap_or("");
                let topic = Topic::normalize(raw).ok_or(ReviewError::EmptyTopic)?;
                let notice = (self.known_topics.contains(&topic)
                    && topic.is_divergent_variant(raw))
                .then(|| TopicNotice {
                    entered: raw.to_string(),
                    topic: topic.clone(),
                });
                if let Some(notice) = &notice {
                    warn!("{}", notice);
                }
                self.known_topics.insert(topic.clone());
                (Mark::Bulleted(topic), notice)
            }
        };

        let previous = record.mark().clone();
        self.store.set_mark(index, mark);
        self.history.push(HistoryEntry {
            record: id.clone(),
            outcome,
            previous,
        });
        self.cursor = match self.store.next_unreviewed(index + 1) {
            Some(i) => Cursor::At(i),
            None => Cursor::Exhausted,
        };
        self.action_count += 1;
        debug!("{} {} (action {})", outcome, id, self.action_count);

        Ok(DecisionReceipt { index, notice })
    }

    /// Decide the record under the cursor.
    pub fn decide_current(
        &mut self,
        outcome: Outcome,
        topic: Option<&str>,
    ) -> Result<DecisionReceipt> {
        let id = self
            .current()
            .map(|r| r.id.clone())
            .ok_or(ReviewError::Exhausted)?;
        self.decide(&id, outcome, topic)
    }

    /// Revert the most recent decision and move the cursor back to it.
    pub fn undo(&mut self) -> Result<HistoryEntry> {
        let Some(last) = self.history.last() else {
            return Err(ReviewError::NothingToUndo);
        };
        let index = self
            .store
            .position(&last.record)
            .ok_or_else(|| ReviewError::UnknownRecord(last.record.clone()))?;
        let entry = self.history.pop().ok_or(ReviewError::NothingToUndo)?;

        self.store.set_mark(index, entry.previous.clone());
        self.cursor = Cursor::At(index);
        debug!("undid {} on {}", entry.outcome, entry.record);
        Ok(entry)
    }

    /// Clear all marks and history. Callers should confirm with the reviewer
    /// first when [`Self::has_existing_review_marks`] is true.
    pub fn reset_for_rereview(&mut self) {
        self.store.reset();
        self.history.clear();
        self.known_topics.clear();
        self.action_count = 0;
        self.cursor = if self.store.is_empty() {
            Cursor::Exhausted
        } else {
            Cursor::At(0)
        };
    }
}
