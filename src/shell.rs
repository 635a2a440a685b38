//! Interactive review shell

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;

use crate::controller::{ActionOutcome, CycleReport, ReplicationStatus, SessionController};
use crate::decision::Outcome;
use crate::error::ReviewError;
use crate::session::Cursor;

const COMMANDS: &[&str] = &[
    "pass", "bullet", "undo", "save", "dest", "copy", "topics", "status", "show", "reset",
    "help", "quit", "exit",
];

const HELP_TEXT: &str = r#"
clipbook shell - Interactive review

Commands:
  pass (p)
      Mark the current record as passed

  bullet (b) <topic>
      File the current record under <topic> (stored upper-case)

  undo (u)
      Revert the last decision

  save
      Save the snapshot and clipbook now

  dest [<name>]
      Show or change where snapshots are written

  copy [<name>]
      Write a one-off reviewed copy (default: reviewed_<name>_<timestamp>.csv)

  topics
      List topics used so far

  status
      Show review counts

  show
      Show the current record again

  reset [--yes]
      Clear every review mark and start over

  help
      Show this help message

  quit, exit
      Exit the shell

Tab completion is available for commands and topics.
"#;

struct ReviewHelper {
    topics: Vec<String>,
}

impl ReviewHelper {
    fn new() -> Self {
        Self { topics: Vec::new() }
    }
}

impl Completer for ReviewHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        let words: Vec<&str> = line_to_cursor.split_whitespace().collect();

        if words.is_empty() || (words.len() == 1 && !line_to_cursor.ends_with(' ')) {
            let prefix = words.first().copied().unwrap_or("");
            let candidates: Vec<Pair> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(prefix))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            let start = line_to_cursor.rfind(' ').map(|i| i + 1).unwrap_or(0);
            return Ok((start, candidates));
        }

        // Topics may contain spaces, so complete against everything after the command.
        let cmd = words.first().copied();
        if cmd == Some("bullet") || cmd == Some("b") {
            let start = line_to_cursor
                .find(char::is_whitespace)
                .map(|i| i + 1)
                .unwrap_or(pos);
            let typed = line_to_cursor[start..].trim_start();
            let start = pos - typed.len();
            let typed_upper = typed.to_uppercase();
            let candidates: Vec<Pair> = self
                .topics
                .iter()
                .filter(|t| t.starts_with(&typed_upper))
                .map(|t| Pair {
                    display: t.clone(),
                    replacement: t.clone(),
                })
                .collect();
            return Ok((start, candidates));
        }

        Ok((pos, vec![]))
    }
}

impl Hinter for ReviewHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ReviewHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }
}

impl Validator for ReviewHelper {}

impl Helper for ReviewHelper {}

/// Split a command line respecting quoted strings
fn shell_split(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = ' ';

    for c in line.chars() {
        if in_quotes {
            if c == quote_char {
                in_quotes = false;
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quotes = true;
            quote_char = c;
        } else if c == ' ' || c == '\t' {
            if !current.is_empty() {
                tokens.push(current.clone());
                current.clear();
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Raw topic text after the command word. Inner and trailing whitespace is
/// kept so near-duplicates of known topics still raise a notice; one pair of
/// surrounding quotes is removed.
fn topic_arg(line: &str) -> Option<&str> {
    let (_, rest) = line.trim_start().split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let rest = ['"', '\'']
        .iter()
        .find_map(|&q| {
            rest.strip_prefix(q)
                .and_then(|inner| inner.strip_suffix(q))
        })
        .unwrap_or(rest);
    if rest.trim().is_empty() {
        None
    } else {
        Some(rest)
    }
}

fn print_current(ctl: &SessionController) {
    let Cursor::At(index) = ctl.cursor() else {
        println!("All rows reviewed.");
        return;
    };
    let Some(record) = ctl.current() else {
        return;
    };
    let total = ctl.counts().total;

    println!("\nRow {} of {}", index + 1, total);
    if let Some(ts) = record.timestamp {
        println!("{}", ts.format("%Y-%m-%d %H:%M"));
    }
    println!("{}", record.text);
    if let Some(flags) = &record.flags {
        println!("Flags: {}", flags);
    }
    if record.is_quote {
        println!("QUOTE TWEET");
    }
    println!("Link: {}", record.url());
}

fn print_cycle(report: &CycleReport) {
    println!(
        "Progress saved at {} ({} records -> {}, {} bullets -> {})",
        report.saved_at.format("%Y-%m-%d %H:%M:%S"),
        report.rows,
        report.snapshot.display(),
        report.bulleted,
        report.export.display()
    );
    match &report.replication {
        ReplicationStatus::Disabled => {}
        ReplicationStatus::Replicated(r) => {
            println!("Pushed {} (removed {} older copies)", r.uploaded, r.pruned.len());
            if !r.prune_failures.is_empty() {
                println!(
                    "Warning: could not remove {}",
                    r.prune_failures.join(", ")
                );
            }
        }
        ReplicationStatus::Failed(reason) => println!("Warning: {}", reason),
    }
}

fn print_save<T>(outcome: &ActionOutcome<T>) {
    if let Some(cycle) = &outcome.cycle {
        print_cycle(cycle);
    }
    if let Some(e) = &outcome.save_error {
        println!("Error: progress was not saved: {}", e);
    }
}

fn print_status(ctl: &SessionController) {
    let counts = ctl.counts();
    println!("Passed:         {}", counts.passed);
    println!("Bulleted:       {}", counts.bulleted);
    println!("Total reviewed: {}/{}", counts.reviewed(), counts.total);
    println!(
        "Next save in {} actions (every {})",
        ctl.save_interval().saturating_sub(ctl.action_count()),
        ctl.save_interval()
    );
    println!("Snapshot:       {}", ctl.destination().display());
    println!("Clipbook:       {}", ctl.export_path().display());
    if let Some(saved) = ctl.last_saved() {
        println!("Last saved:     {}", saved.format("%Y-%m-%d %H:%M:%S"));
    }
    if ctl.has_existing_review_marks() {
        println!("Existing review marks detected.");
    }
}

fn execute_command(ctl: &mut SessionController, line: &str) -> Result<bool> {
    let parts = shell_split(line);
    if parts.is_empty() {
        return Ok(true);
    }

    let cmd = parts[0].as_str();
    let args: Vec<&str> = parts[1..].iter().map(|s| s.as_str()).collect();
    let args = args.as_slice();

    match cmd {
        "help" | "?" => {
            println!("{}", HELP_TEXT);
        }
        "quit" | "exit" => {
            return Ok(false);
        }
        "pass" | "p" => {
            let outcome = ctl.decide_current(Outcome::Pass, None)?;
            print_save(&outcome);
            print_current(ctl);
        }
        "bullet" | "b" => {
            let Some(topic) = topic_arg(line) else {
                println!("Provide a topic before marking as bullet.");
                return Ok(true);
            };
            let outcome = ctl.decide_current(Outcome::Bullet, Some(topic))?;
            if let Some(notice) = &outcome.value.notice {
                println!("Note: {}", notice);
            }
            print_save(&outcome);
            print_current(ctl);
        }
        "undo" | "u" => match ctl.undo() {
            Ok(outcome) => {
                println!("Undid {} on {}", outcome.value.outcome, outcome.value.record);
                print_save(&outcome);
                print_current(ctl);
            }
            Err(ReviewError::NothingToUndo) => println!("Nothing to undo yet."),
            Err(e) => return Err(e.into()),
        },
        "save" => {
            let report = ctl.force_save()?;
            print_cycle(&report);
        }
        "dest" => {
            if !args.is_empty() {
                ctl.set_destination_name(&args.join(" "));
            }
            println!("Snapshots go to {}", ctl.destination().display());
        }
        "copy" => {
            let name = if args.is_empty() {
                ctl.default_copy_path().to_string_lossy().to_string()
            } else {
                args.join(" ")
            };
            let persisted = ctl.export_copy(&name)?;
            println!("Saved reviewed copy to {}", persisted.path.display());
        }
        "topics" => {
            let topics = ctl.known_topics().sorted();
            if topics.is_empty() {
                println!("No topics yet.");
            }
            for topic in topics {
                println!("  {}", topic);
            }
        }
        "status" => print_status(ctl),
        "show" => print_current(ctl),
        "reset" => {
            let confirmed = args.contains(&"--yes") || args.contains(&"-y");
            if ctl.has_existing_review_marks() && !confirmed {
                println!("Existing review marks detected. Run 'reset --yes' to clear them.");
                return Ok(true);
            }
            let report = ctl.reset_for_rereview()?;
            println!("All review marks cleared.");
            print_cycle(&report);
            print_current(ctl);
        }
        _ => {
            println!(
                "Unknown command: {}. Type 'help' for available commands.",
                cmd
            );
        }
    }

    Ok(true)
}

fn refresh_topics(rl: &mut Editor<ReviewHelper, DefaultHistory>, ctl: &SessionController) {
    if let Some(helper) = rl.helper_mut() {
        helper.topics = ctl
            .known_topics()
            .sorted()
            .into_iter()
            .map(|t| t.as_str().to_string())
            .collect();
    }
}

/// Run the interactive review shell
pub fn run_shell(mut ctl: SessionController) -> Result<()> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)?
        .build();

    let mut rl: Editor<ReviewHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(ReviewHelper::new()));

    let history_path = dirs::data_local_dir()
        .map(|p| p.join("clipbook").join("shell_history"))
        .unwrap_or_else(|| std::path::PathBuf::from(".clipbook_history"));

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let _ = rl.load_history(&history_path);

    println!("clipbook shell v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Progress saves every {} actions. Type 'help' for commands, 'quit' to exit.",
        ctl.save_interval()
    );
    if ctl.has_existing_review_marks() {
        println!("Existing review marks detected. Use 'reset' to start over.");
    }
    print_current(&ctl);

    loop {
        refresh_topics(&mut rl, &ctl);
        let readline = rl.readline("clipbook> ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.trim());

                match execute_command(&mut ctl, &line) {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => println!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    if ctl.action_count() > 0 {
        match ctl.force_save() {
            Ok(report) => print_cycle(&report),
            Err(e) => println!("Error: {}", e),
        }
    }

    Ok(())
}
