use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Canonical topic label: trimmed, inner whitespace collapsed, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Normalize reviewer input. Returns `None` when nothing but whitespace
    /// was entered.
    pub fn normalize(raw: &str) -> Option<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            None
        } else {
            Some(Self(collapsed.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `raw` only maps onto this topic because of whitespace
    /// cleanup, as opposed to plain case folding.
    pub fn is_divergent_variant(&self, raw: &str) -> bool {
        raw.to_uppercase() != self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reviewer-facing notice raised when input was merged into an existing
/// topic only after whitespace cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNotice {
    pub entered: String,
    pub topic: Topic,
}

impl fmt::Display for TopicNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topic {:?} was filed under existing topic {}",
            self.entered, self.topic
        )
    }
}

/// Distinct topics seen in a session, kept in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct KnownTopics {
    order: Vec<Topic>,
    index: HashSet<Topic>,
}

impl KnownTopics {
    /// Returns true if the topic was not known before.
    pub fn insert(&mut self, topic: Topic) -> bool {
        if self.index.contains(&topic) {
            return false;
        }
        self.index.insert(topic.clone());
        self.order.push(topic);
        true
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.index.contains(topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.order.iter()
    }

    /// Alphabetical listing for pickers.
    pub fn sorted(&self) -> Vec<&Topic> {
        let mut topics: Vec<&Topic> = self.order.iter().collect();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}
