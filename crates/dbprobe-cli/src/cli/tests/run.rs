//! Tests for the run subcommand.

use super::parse;
use crate::cli::{use_sqlite, Cli, CliCommand};
use clap::Parser;
use dbprobe_core::config::{Backend, HarnessConfig};
use std::path::Path;

#[test]
fn cli_parse_run_defaults() {
    let cli = parse(&["dbprobe", "run"]);
    assert!(cli.config.is_none());
    assert!(!cli.log_file);
    match cli.command {
        CliCommand::Run {
            rounds,
            attempts,
            sqlite,
        } => {
            assert!(rounds.is_none());
            assert!(attempts.is_none());
            assert!(sqlite.is_none());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_overrides() {
    let cli = parse(&[
        "dbprobe",
        "run",
        "--rounds",
        "5",
        "--attempts",
        "2",
        "--sqlite",
        "/tmp/probe.db",
        "--log-file",
    ]);
    assert!(cli.log_file);
    match cli.command {
        CliCommand::Run {
            rounds,
            attempts,
            sqlite,
        } => {
            assert_eq!(rounds, Some(5));
            assert_eq!(attempts, Some(2));
            assert_eq!(sqlite.as_deref(), Some(Path::new("/tmp/probe.db")));
        }
        _ => panic!("expected Run with overrides"),
    }
}

#[test]
fn cli_parse_run_rejects_non_numeric_rounds() {
    assert!(Cli::try_parse_from(["dbprobe", "run", "--rounds", "many"]).is_err());
}

#[test]
fn sqlite_flag_switches_backend() {
    let mut cfg = HarnessConfig::default();
    use_sqlite(&mut cfg, None);
    assert_eq!(cfg.database.backend, Backend::Mysql);
    use_sqlite(&mut cfg, Some("/tmp/x.db".into()));
    assert_eq!(cfg.database.backend, Backend::Sqlite);
    assert!(cfg.validate().is_ok());
}
