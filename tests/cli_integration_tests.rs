use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn clipbook_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("clipbook").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("CLIPBOOK_HANDLE")
        .env_remove("CLIPBOOK_SAVE_INTERVAL")
        .env_remove("CLIPBOOK_EXPORT_PATH")
        .env_remove("CLIPBOOK_GITHUB_TOKEN")
        .env_remove("CLIPBOOK_REMOTE_REPO");
    cmd
}

const REVIEWED: &str = "URL,Text,Date,Reviewed,Bullet topic\n\
                        https://x.com/a/1,first,2024-01-05,Bulleted,trade\n\
                        https://x.com/a/2,second,2024-01-06,Passed,\n\
                        ,no link,2024-01-07,,\n\
                        https://x.com/a/3,third,2024-01-08,,\n";

const FRESH: &str = "URL,Text,Date\n\
                     https://x.com/a/1,first,2024-01-05\n\
                     https://x.com/a/2,second,2024-01-06\n\
                     https://x.com/a/3,third,2024-01-08\n";

fn write_table(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

// =============================================================================
// Files Command
// =============================================================================

#[test]
fn test_files_empty_directory() {
    let dir = TempDir::new().unwrap();
    clipbook_cmd(&dir)
        .arg("files")
        .assert()
        .success()
        .stdout(predicate::str::contains("No review tables found."));
}

#[test]
fn test_files_lists_csv_only() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "b.csv", REVIEWED);
    write_table(&dir, "a.CSV", REVIEWED);
    write_table(&dir, "notes.txt", "hello");

    clipbook_cmd(&dir)
        .arg("files")
        .assert()
        .success()
        .stdout(predicate::str::contains("a.CSV"))
        .stdout(predicate::str::contains("b.csv"))
        .stdout(predicate::str::contains("notes.txt").not());
}

// =============================================================================
// Status Command
// =============================================================================

#[test]
fn test_status_reports_progress() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .args(["status", "tweets.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 rows without a URL"))
        .stdout(predicate::str::contains("Records:  3"))
        .stdout(predicate::str::contains("Reviewed: 2/3"))
        .stdout(predicate::str::contains("TRADE"))
        .stdout(predicate::str::contains("Existing review marks detected."));
}

#[test]
fn test_status_missing_url_column_fails() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "bad.csv", "Text\nhello\n");

    clipbook_cmd(&dir)
        .args(["status", "bad.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("URL"));
}

#[test]
fn test_status_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    clipbook_cmd(&dir)
        .args(["status", "nope.csv"])
        .assert()
        .failure();
}

// =============================================================================
// Export Command
// =============================================================================

#[test]
fn test_export_default_markdown() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .args(["export", "tweets.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 bullets in 1 topics"));

    let md = fs::read_to_string(dir.path().join("Issue Clipbook.md")).unwrap();
    assert_eq!(
        md,
        "## TRADE\n\n\"first\" [1, @RandyFeenstra, [1/5/24](https://x.com/a/1)]\n\n"
    );
}

#[test]
fn test_export_html_with_handle() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .args(["export", "tweets.csv", "--out", "clips.html", "--handle", "@someone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(html)"));

    let html = fs::read_to_string(dir.path().join("clips.html")).unwrap();
    assert!(html.contains("<h2>TRADE</h2>"));
    assert!(html.contains("@someone"));
}

#[test]
fn test_export_honors_env_handle() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .env("CLIPBOOK_HANDLE", "envhandle")
        .args(["export", "tweets.csv", "-o", "out.md"])
        .assert()
        .success();

    let md = fs::read_to_string(dir.path().join("out.md")).unwrap();
    assert!(md.contains("@envhandle"));
}

// =============================================================================
// Copy Command
// =============================================================================

#[test]
fn test_copy_writes_normalized_table() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .args(["copy", "tweets.csv", "backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved reviewed copy to"))
        .stdout(predicate::str::contains("(3 records)"));

    let copy = fs::read_to_string(dir.path().join("backup.csv")).unwrap();
    assert!(copy.starts_with("URL,Text,Date,Reviewed,Bullet topic\n"));
    assert!(copy.contains("https://x.com/a/1,first,2024-01-05,Bulleted,TRADE"));
    assert!(!copy.contains("no link"));
}

#[test]
fn test_copy_default_name_is_timestamped() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .args(["copy", "tweets.csv"])
        .assert()
        .success();

    let copies: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("reviewed_tweets_") && name.ends_with(".csv"))
        .collect();
    assert_eq!(copies.len(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("tweets.csv")).unwrap(),
        REVIEWED
    );
}

// =============================================================================
// Review Command
// =============================================================================

#[test]
fn test_review_progress_resumes_on_reopen() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", FRESH);

    clipbook_cmd(&dir)
        .env("XDG_DATA_HOME", dir.path().join("data"))
        .args(["review", "tweets.csv"])
        .write_stdin("pass\nbullet trade\nquit\n")
        .assert()
        .success();

    let saved = fs::read_to_string(dir.path().join("tweets.csv")).unwrap();
    assert!(saved.contains("https://x.com/a/1,first,2024-01-05,Passed,"));
    assert!(saved.contains("https://x.com/a/2,second,2024-01-06,Bulleted,TRADE"));

    clipbook_cmd(&dir)
        .args(["status", "tweets.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reviewed: 2/3"))
        .stdout(predicate::str::contains("Existing review marks detected."));
}

#[test]
fn test_invalid_interval_env_fails_review() {
    let dir = TempDir::new().unwrap();
    write_table(&dir, "tweets.csv", REVIEWED);

    clipbook_cmd(&dir)
        .env("CLIPBOOK_SAVE_INTERVAL", "0")
        .args(["review", "tweets.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLIPBOOK_SAVE_INTERVAL"));
}
