//! Normalized, ordered set of reviewable records.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Result, ReviewError};
use crate::id::RecordId;
use crate::table::Table;
use crate::topic::Topic;

pub const URL_COLUMN: &str = "URL";
pub const TEXT_COLUMN: &str = "Text";
/// Date columns in priority order; the first one holding a parseable value wins.
pub const DATE_COLUMNS: [&str; 2] = ["Date Correct Format", "Date"];
pub const REVIEWED_COLUMN: &str = "Reviewed";
pub const TOPIC_COLUMN: &str = "Bullet topic";
pub const QUOTE_COLUMNS: [&str; 2] = ["is_quote_tweet", "Quote Tweet"];
pub const FLAGS_COLUMN: &str = "bad_words_found";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Passed,
    Bulleted,
}

impl ReviewStatus {
    /// Value written to the `Reviewed` column.
    pub fn as_cell(&self) -> &'static str {
        match self {
            ReviewStatus::Unreviewed => "",
            ReviewStatus::Passed => "Passed",
            ReviewStatus::Bulleted => "Bulleted",
        }
    }

    pub fn from_cell(cell: &str) -> Self {
        match cell.trim().to_lowercase().as_str() {
            "passed" | "pass" => ReviewStatus::Passed,
            "bulleted" | "bullet" => ReviewStatus::Bulleted,
            _ => ReviewStatus::Unreviewed,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Unreviewed => write!(f, "unreviewed"),
            ReviewStatus::Passed => write!(f, "passed"),
            ReviewStatus::Bulleted => write!(f, "bulleted"),
        }
    }
}

/// Review state of one record. A topic exists exactly when the record is
/// bulleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mark {
    #[default]
    Unreviewed,
    Passed,
    Bulleted(Topic),
}

impl Mark {
    pub fn status(&self) -> ReviewStatus {
        match self {
            Mark::Unreviewed => ReviewStatus::Unreviewed,
            Mark::Passed => ReviewStatus::Passed,
            Mark::Bulleted(_) => ReviewStatus::Bulleted,
        }
    }

    pub fn topic(&self) -> Option<&Topic> {
        match self {
            Mark::Bulleted(topic) => Some(topic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    pub id: RecordId,
    pub text: String,
    pub timestamp: Option<NaiveDateTime>,
    pub is_quote: bool,
    pub flags: Option<String>,
    cells: Vec<String>,
    mark: Mark,
}

impl Record {
    pub fn url(&self) -> &str {
        self.id.as_str()
    }

    pub fn status(&self) -> ReviewStatus {
        self.mark.status()
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.mark.topic()
    }

    pub fn mark(&self) -> &Mark {
        &self.mark
    }

    /// Original row cells, aligned with [`RecordStore::headers`].
    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// Outcome of [`RecordStore::load`] for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub kept: usize,
    pub dropped_missing_url: usize,
    pub dropped_duplicates: usize,
    pub demoted_marks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    headers: Vec<String>,
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl RecordStore {
    pub fn load(table: Table) -> Result<(Self, LoadReport)> {
        let url_col = table.column(URL_COLUMN).ok_or_else(|| {
            ReviewError::Load(format!("expected a '{}' column", URL_COLUMN))
        })?;
        let text_col = table.column(TEXT_COLUMN);
        let date_cols: Vec<usize> = DATE_COLUMNS
            .iter()
            .filter_map(|name| table.column(name))
            .collect();
        let reviewed_col = table.column(REVIEWED_COLUMN);
        let topic_col = table.column(TOPIC_COLUMN);
        let quote_cols: Vec<usize> = QUOTE_COLUMNS
            .iter()
            .filter_map(|name| table.column(name))
            .collect();
        let flags_col = table.column(FLAGS_COLUMN);

        let mut report = LoadReport::default();
        let mut seen: HashSet<RecordId> = HashSet::new();
        let mut records = Vec::with_capacity(table.rows.len());

        for (row_num, cells) in table.rows.into_iter().enumerate() {
            let cell = |idx: Option<usize>| cell_at(&cells, idx);

            let Some(id) = RecordId::from_url(cell(Some(url_col))) else {
                report.dropped_missing_url += 1;
                continue;
            };
            if !seen.insert(id.clone()) {
                debug!("dropping duplicate row {} for {}", row_num + 1, id);
                report.dropped_duplicates += 1;
                continue;
            }

            let timestamp = date_cols
                .iter()
                .find_map(|&i| parse_timestamp(cell(Some(i))));
            let is_quote = quote_cols.iter().any(|&i| is_truthy(cell(Some(i))));
            let flags = Some(cell(flags_col).trim())
                .filter(|s| !s.is_empty())
                .map(String::from);

            let mark = match ReviewStatus::from_cell(cell(reviewed_col)) {
                ReviewStatus::Unreviewed => Mark::Unreviewed,
                ReviewStatus::Passed => Mark::Passed,
                ReviewStatus::Bulleted => match Topic::normalize(cell(topic_col)) {
                    Some(topic) => Mark::Bulleted(topic),
                    None => {
                        warn!(
                            "row {} is marked bulleted without a topic; reopening it",
                            row_num + 1
                        );
                        report.demoted_marks += 1;
                        Mark::Unreviewed
                    }
                },
            };

            records.push(Record {
                id,
                text: cell(text_col).to_string(),
                timestamp,
                is_quote,
                flags,
                cells,
                mark,
            });
        }

        // Stable: ties and undated rows keep load order, undated rows last.
        records.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        report.kept = records.len();

        info!(
            "loaded {} records ({} without URL, {} duplicates dropped)",
            report.kept, report.dropped_missing_url, report.dropped_duplicates
        );

        Ok((
            Self {
                headers: table.headers,
                records,
                index,
            },
            report,
        ))
    }

    /// Clear every review mark. Identity and ordering are kept.
    pub fn reset(&mut self) {
        for record in &mut self.records {
            record.mark = Mark::Unreviewed;
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn find(&self, id: &RecordId) -> Option<&Record> {
        self.position(id).and_then(|i| self.records.get(i))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, status: ReviewStatus) -> usize {
        self.records.iter().filter(|r| r.status() == status).count()
    }

    pub fn has_review_marks(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.status() != ReviewStatus::Unreviewed)
    }

    /// First unreviewed index at or after `from`, wrapping to the start.
    pub fn next_unreviewed(&self, from: usize) -> Option<usize> {
        let len = self.records.len();
        (0..len)
            .map(|offset| (from + offset) % len)
            .find(|&i| self.records[i].status() == ReviewStatus::Unreviewed)
    }

    pub(crate) fn set_mark(&mut self, index: usize, mark: Mark) {
        if let Some(record) = self.records.get_mut(index) {
            record.mark = mark;
        }
    }
}

/// Parse a date cell in the formats spreadsheet exports commonly produce.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    const DATETIME_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    // Two-digit years are tried before four-digit ones so "3/4/24" is 2024.
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn cell_at(cells: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| cells.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-04"), Some(expected));
        assert_eq!(parse_timestamp("3/4/2024"), Some(expected));
        assert_eq!(parse_timestamp("3/4/24"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-04 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-04T00:00:00Z"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_status_cells() {
        assert_eq!(ReviewStatus::from_cell("Passed"), ReviewStatus::Passed);
        assert_eq!(ReviewStatus::from_cell(" bullet "), ReviewStatus::Bulleted);
        assert_eq!(ReviewStatus::from_cell(""), ReviewStatus::Unreviewed);
        assert_eq!(ReviewStatus::Bulleted.as_cell(), "Bulleted");
    }

    #[test]
    fn test_truthy() {
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }
}
