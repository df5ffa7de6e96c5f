//! CLI help and usage output.

use crate::prelude::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn no_args_shows_usage_and_exits_nonzero() {
    cli().command().assert().failure().stderr(predicate::str::contains("Usage:"));
}

#[test]
fn top_level_help_lists_subcommands() {
    cli()
        .args(&["--help"])
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("retry"))
        .stdout(predicate::str::contains("server"));
}

#[test]
fn process_help_shows_usage() {
    cli().args(&["process", "--help"]).command().assert().success().stdout(predicate::str::contains("Usage:"));
}

#[test]
fn server_help_shows_subcommands() {
    cli()
        .args(&["server", "--help"])
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn version_flag_shows_version() {
    cli().args(&["--version"]).command().assert().success().stdout(predicate::str::contains("0.1"));
}
