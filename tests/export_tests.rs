use clipbook::export::{self, ExportFormat};
use clipbook::record::RecordStore;
use clipbook::session::ReviewSession;
use clipbook::table::Table;
use clipbook::{Outcome, RecordId};
use std::fs;
use tempfile::TempDir;

fn session(csv: &str) -> ReviewSession {
    let table = Table::from_reader(csv.as_bytes()).unwrap();
    let (store, _) = RecordStore::load(table).unwrap();
    ReviewSession::new(store)
}

fn id(n: u32) -> RecordId {
    RecordId::from_url(&format!("https://x.com/a/{}", n)).unwrap()
}

const FOUR_ROWS: &str = "URL,Text,Date\n\
                         https://x.com/a/1,first post,2024-01-05\n\
                         https://x.com/a/2,second post,2024-01-06\n\
                         https://x.com/a/3,third post,2024-01-07\n\
                         https://x.com/a/4,fourth post,\n";

// =============================================================================
// Grouping and numbering
// =============================================================================

#[test]
fn test_topics_follow_store_order_not_alphabet() {
    let mut s = session(FOUR_ROWS);
    s.decide(&id(1), Outcome::Bullet, Some("zebra")).unwrap();
    s.decide(&id(2), Outcome::Bullet, Some("apple")).unwrap();
    s.decide(&id(3), Outcome::Bullet, Some("zebra")).unwrap();

    let doc = export::build(s.store(), "someone");
    let topics: Vec<&str> = doc.sections.iter().map(|s| s.topic.as_str()).collect();
    assert_eq!(topics, vec!["ZEBRA", "APPLE"]);

    let zebra: Vec<usize> = doc.sections[0].entries.iter().map(|e| e.index).collect();
    assert_eq!(zebra, vec![1, 2]);
    assert_eq!(doc.sections[1].entries[0].index, 1);
    assert_eq!(doc.entry_count(), 3);
}

#[test]
fn test_decision_order_does_not_matter() {
    let mut a = session(FOUR_ROWS);
    a.decide(&id(3), Outcome::Bullet, Some("trade")).unwrap();
    a.decide(&id(1), Outcome::Bullet, Some("trade")).unwrap();

    let mut b = session(FOUR_ROWS);
    b.decide(&id(1), Outcome::Bullet, Some("trade")).unwrap();
    b.decide(&id(3), Outcome::Bullet, Some("trade")).unwrap();

    assert_eq!(
        export::build(a.store(), "h").render_markdown(),
        export::build(b.store(), "h").render_markdown()
    );
}

#[test]
fn test_indices_contiguous_after_undo() {
    let mut s = session(FOUR_ROWS);
    s.decide(&id(1), Outcome::Bullet, Some("trade")).unwrap();
    s.decide(&id(2), Outcome::Bullet, Some("trade")).unwrap();
    s.decide(&id(3), Outcome::Bullet, Some("trade")).unwrap();
    s.undo().unwrap();
    s.undo().unwrap();
    s.decide(&id(3), Outcome::Bullet, Some("trade")).unwrap();

    let doc = export::build(s.store(), "h");
    let entries = &doc.sections[0].entries;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].url, "https://x.com/a/1");
    assert_eq!(entries[1].url, "https://x.com/a/3");
    assert_eq!(entries[1].index, 2);
}

#[test]
fn test_passed_records_are_excluded() {
    let mut s = session(FOUR_ROWS);
    s.decide(&id(1), Outcome::Pass, None).unwrap();
    let doc = export::build(s.store(), "h");
    assert!(doc.sections.is_empty());
    assert_eq!(doc.render_markdown(), "");
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_markdown_citation_format() {
    let mut s = session(FOUR_ROWS);
    s.decide(&id(1), Outcome::Bullet, Some("farm bill")).unwrap();
    s.decide(&id(4), Outcome::Bullet, Some("farm bill")).unwrap();

    let md = export::build(s.store(), "RandyFeenstra").render_markdown();
    assert_eq!(
        md,
        "## FARM BILL\n\n\
         \"first post\" [1, @RandyFeenstra, [1/5/24](https://x.com/a/1)]\n\n\
         \"fourth post\" [2, @RandyFeenstra, [n.d.](https://x.com/a/4)]\n\n"
    );
}

#[test]
fn test_html_escapes_content() {
    let mut s = session(
        "URL,Text,Date\n\
         https://x.com/a/1,a <b> & c,2024-01-05\n",
    );
    s.decide(&id(1), Outcome::Bullet, Some("r&d")).unwrap();

    let html = export::build(s.store(), "h").render_html();
    assert!(html.contains("<h2>R&amp;D</h2>"));
    assert!(html.contains("a &lt;b&gt; &amp; c"));
    assert!(html.contains("<a href=\"https://x.com/a/1\">1/5/24</a>"));
}

#[test]
fn test_write_is_idempotent_and_picks_format() {
    let dir = TempDir::new().unwrap();
    let mut s = session(FOUR_ROWS);
    s.decide(&id(2), Outcome::Bullet, Some("trade")).unwrap();
    let doc = export::build(s.store(), "h");

    let md = dir.path().join("clips.md");
    doc.write(&md).unwrap();
    let first = fs::read(&md).unwrap();
    export::build(s.store(), "h").write(&md).unwrap();
    assert_eq!(first, fs::read(&md).unwrap());

    let html = dir.path().join("clips.html");
    doc.write(&html).unwrap();
    let body = fs::read_to_string(&html).unwrap();
    assert!(body.starts_with("<!DOCTYPE html>"));
    assert_eq!(body, doc.render(ExportFormat::Html));
}
