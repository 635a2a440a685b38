use clap::Parser;
use clipbook::cli::{build_config, Cli, Commands, ConfigOverrides};
use std::path::PathBuf;

#[test]
fn test_cli_parse_files() {
    let cli = Cli::parse_from(["clipbook", "files"]);
    assert!(matches!(cli.command, Commands::Files));
}

#[test]
fn test_cli_parse_review_defaults() {
    let cli = Cli::parse_from(["clipbook", "review", "tweets.csv"]);

    if let Commands::Review {
        file,
        dest,
        interval,
        handle,
        export,
    } = cli.command
    {
        assert_eq!(file, PathBuf::from("tweets.csv"));
        assert!(dest.is_none());
        assert!(interval.is_none());
        assert!(handle.is_none());
        assert!(export.is_none());
    } else {
        panic!("Expected Review command");
    }
}

#[test]
fn test_cli_parse_review_with_options() {
    let cli = Cli::parse_from([
        "clipbook",
        "review",
        "tweets.csv",
        "--dest",
        "out.csv",
        "-i",
        "5",
        "--handle",
        "someone",
        "-e",
        "clips.html",
    ]);

    if let Commands::Review {
        dest,
        interval,
        handle,
        export,
        ..
    } = cli.command
    {
        assert_eq!(dest, Some(PathBuf::from("out.csv")));
        assert_eq!(interval, Some(5));
        assert_eq!(handle.as_deref(), Some("someone"));
        assert_eq!(export, Some(PathBuf::from("clips.html")));
    } else {
        panic!("Expected Review command");
    }
}

#[test]
fn test_cli_parse_copy() {
    let cli = Cli::parse_from(["clipbook", "copy", "tweets.csv", "backup"]);
    if let Commands::Copy { file, dest } = cli.command {
        assert_eq!(file, PathBuf::from("tweets.csv"));
        assert_eq!(dest.as_deref(), Some("backup"));
    } else {
        panic!("Expected Copy command");
    }
}

#[test]
fn test_cli_parse_copy_default_dest() {
    let cli = Cli::parse_from(["clipbook", "copy", "tweets.csv"]);
    if let Commands::Copy { dest, .. } = cli.command {
        assert!(dest.is_none());
    } else {
        panic!("Expected Copy command");
    }
}

#[test]
fn test_cli_requires_file_for_status() {
    assert!(Cli::try_parse_from(["clipbook", "status"]).is_err());
}

#[test]
fn test_build_config_rejects_zero_interval() {
    let overrides = ConfigOverrides {
        interval: Some(0),
        ..Default::default()
    };
    assert!(build_config(overrides).is_err());
}

#[test]
fn test_build_config_strips_handle_prefix() {
    let overrides = ConfigOverrides {
        handle: Some("@someone".to_string()),
        ..Default::default()
    };
    let config = build_config(overrides).unwrap();
    assert_eq!(config.handle, "someone");
}
