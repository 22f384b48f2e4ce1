//! Tests for the remaining subcommands and global flags.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_init_table() {
    match parse(&["dbprobe", "init-table"]).command {
        CliCommand::InitTable { sqlite } => assert!(sqlite.is_none()),
        _ => panic!("expected InitTable"),
    }
}

#[test]
fn cli_parse_show_config_with_global_config() {
    let cli = parse(&["dbprobe", "show-config", "--config", "/etc/dbprobe.toml"]);
    assert_eq!(cli.config.as_deref(), Some(Path::new("/etc/dbprobe.toml")));
    assert!(matches!(cli.command, CliCommand::ShowConfig));
}

#[test]
fn cli_parse_init_config() {
    assert!(matches!(
        parse(&["dbprobe", "init-config"]).command,
        CliCommand::InitConfig
    ));
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["dbprobe"]).is_err());
}
