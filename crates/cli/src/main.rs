// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! annorun: parallel batch execution engine for a medical-text annotator.
//!
//! Synchronous by design -- no tokio anywhere in this crate -- since the
//! rest of the workspace runs on the thread-pool-plus-bounded-queue model
//! rather than an async runtime.

mod commands;
mod exit_error;
mod logging;
mod table;

use clap::{Parser, Subcommand};
use commands::{ProcessArgs, ResumeArgs, RetryArgs, ServerArgs, StatusArgs};
use exit_error::ExitError;

/// Process exit code. `main` translates this into `std::process::exit`.
pub type ExitCode = i32;

#[derive(Parser)]
#[command(name = "annorun", about = "Parallel batch runner for a medical-text annotator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a fresh or resumed batch over an input directory.
    Process(ProcessArgs),
    /// Resume the batch whose state lives at an output root.
    Resume(ResumeArgs),
    /// Print a summary of a batch's persisted state.
    Status(StatusArgs),
    /// Re-enqueue failed files with a reset attempt count.
    Retry(RetryArgs),
    /// Control the supervised tagger/WSD daemons directly.
    Server(ServerArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process(args) => commands::process::run(args),
        Commands::Resume(args) => commands::resume::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Retry(args) => commands::retry::run(args),
        Commands::Server(args) => commands::server::run(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{}", format_error(&err));
            let code = err.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(1);
            std::process::exit(code);
        }
    }
}

/// Render an anyhow error chain, collapsing consecutive causes that render
/// identically (common when a lower layer's `Display` already includes its
/// own cause's text).
fn format_error(err: &anyhow::Error) -> String {
    let mut lines = vec![format!("Error: {err}")];
    let mut last = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if text == last {
            continue;
        }
        lines.push(format!("Caused by: {text}"));
        last = text;
    }
    lines.join("\n")
}
