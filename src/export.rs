//! Topic-grouped clipbook document built from bulleted records.
//!
//! The document is a pure projection of the record store: topics appear in
//! the order their first bulleted record appears in the store, entries keep
//! store order, and citation indices restart at 1 in every topic. Nothing
//! here reads the clock, so rebuilding an unchanged store yields identical
//! bytes.

use chrono::{Datelike, NaiveDateTime};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::record::RecordStore;
use crate::snapshot::write_atomic;
use crate::topic::Topic;

pub const DEFAULT_HANDLE: &str = "RandyFeenstra";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
}

impl ExportFormat {
    /// Pick a format from the destination's extension, defaulting to Markdown.
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("html") | Some("htm") => ExportFormat::Html,
            _ => ExportFormat::Markdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// 1-based position within the topic.
    pub index: usize,
    pub quoted_text: String,
    pub date_label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSection {
    pub topic: Topic,
    pub entries: Vec<ExportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub handle: String,
    pub sections: Vec<ExportSection>,
}

pub fn build(store: &RecordStore, handle: &str) -> ExportDocument {
    let mut sections: Vec<ExportSection> = Vec::new();
    let mut positions: HashMap<&Topic, usize> = HashMap::new();

    for record in store.iter() {
        let Some(topic) = record.topic() else {
            continue;
        };
        let slot = *positions.entry(topic).or_insert_with(|| {
            sections.push(ExportSection {
                topic: topic.clone(),
                entries: Vec::new(),
            });
            sections.len() - 1
        });
        let section = &mut sections[slot];
        section.entries.push(ExportEntry {
            index: section.entries.len() + 1,
            quoted_text: quote_text(&record.text),
            date_label: date_label(record.timestamp),
            url: record.url().to_string(),
        });
    }

    ExportDocument {
        handle: handle.to_string(),
        sections,
    }
}

impl ExportDocument {
    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Markdown => self.render_markdown(),
            ExportFormat::Html => self.render_html(),
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = writeln!(out, "## {}\n", section.topic);
            for entry in &section.entries {
                let _ = writeln!(
                    out,
                    "{} [{}, @{}, [{}]({})]\n",
                    entry.quoted_text, entry.index, self.handle, entry.date_label, entry.url
                );
            }
        }
        out
    }

    pub fn render_html(&self) -> String {
        let mut out = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <style>body { font-family: Arial; font-size: 10pt; } \
             h2 { font-size: 12pt; font-weight: bold; }</style>\n</head>\n<body>\n",
        );
        for section in &self.sections {
            let _ = writeln!(out, "<h2>{}</h2>", escape_html(section.topic.as_str()));
            for entry in &section.entries {
                let _ = writeln!(
                    out,
                    "<p>{} [{}, @{}, <a href=\"{}\">{}</a>]</p>",
                    escape_html(&entry.quoted_text),
                    entry.index,
                    escape_html(&self.handle),
                    escape_html(&entry.url),
                    escape_html(&entry.date_label)
                );
            }
        }
        out.push_str("</body>\n</html>\n");
        out
    }

    /// Render in the format implied by `path` and replace the file atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        let rendered = self.render(ExportFormat::for_path(path));
        write_atomic(path, rendered.as_bytes())
    }
}

/// Clean post text for quoting: double quotes become single quotes, line
/// breaks become non-breaking spaces, runs of spaces collapse.
pub fn quote_text(text: &str) -> String {
    let replaced = text
        .replace('"', "'")
        .replace("\r\n", "\u{a0}")
        .replace(['\n', '\r'], "\u{a0}");

    let mut collapsed = String::with_capacity(replaced.len());
    let mut prev_space = false;
    for c in replaced.chars() {
        if c == ' ' {
            if !prev_space {
                collapsed.push(c);
            }
            prev_space = true;
        } else {
            collapsed.push(c);
            prev_space = false;
        }
    }
    format!("\"{}\"", collapsed.trim())
}

/// `M/D/YY`, or `n.d.` for undated records.
pub fn date_label(timestamp: Option<NaiveDateTime>) -> String {
    match timestamp {
        Some(ts) => format!(
            "{}/{}/{:02}",
            ts.month(),
            ts.day(),
            ts.year().rem_euclid(100)
        ),
        None => "n.d.".to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
