// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `server start|stop|status`: control the tagger/WSD daemons directly,
//! independent of running a batch.

use crate::exit_error::{exit_error, EXIT_DAEMON_FAILURE, EXIT_OK};
use crate::table::{Column, Table};
use crate::ExitCode;
use annorun_adapters::{DaemonKind, DaemonSpec, DaemonSupervisor};
use annorun_core::config::{DEFAULT_DAEMON_PROBE_ATTEMPTS, DEFAULT_DAEMON_PROBE_INTERVAL, EnvOverrides};
use std::path::PathBuf;

#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    /// Output root whose `.daemon-pids.json` sidecar tracks these daemons.
    pub output: PathBuf,

    #[command(subcommand)]
    pub action: ServerAction,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum ServerAction {
    Start,
    Stop,
    Status,
}

fn specs(env: &EnvOverrides) -> Vec<DaemonSpec> {
    let tagger_bin = std::env::var_os("ANNORUN_TAGGER_BIN")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tagger"));
    let wsd_bin = std::env::var_os("ANNORUN_WSD_BIN")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("wsd"));
    let tagger_port = env.tagger_port.unwrap_or(annorun_core::config::DEFAULT_TAGGER_PORT);
    let wsd_port = env.wsd_port.unwrap_or(annorun_core::config::DEFAULT_WSD_PORT);

    vec![
        DaemonSpec { kind: DaemonKind::Tagger, command: tagger_bin, args: vec![tagger_port.to_string()], port: tagger_port },
        DaemonSpec { kind: DaemonKind::Wsd, command: wsd_bin, args: vec![wsd_port.to_string()], port: wsd_port },
    ]
}

pub fn run(args: ServerArgs) -> anyhow::Result<ExitCode> {
    let env = EnvOverrides::from_env();
    let specs = specs(&env);
    let mut supervisor = DaemonSupervisor::new(&args.output, DEFAULT_DAEMON_PROBE_ATTEMPTS, DEFAULT_DAEMON_PROBE_INTERVAL);

    match args.action {
        ServerAction::Start => {
            supervisor
                .ensure_up(&specs)
                .map_err(|e| exit_error(EXIT_DAEMON_FAILURE, e.to_string()))?;
            println!("daemons reachable");
            Ok(EXIT_OK)
        }
        ServerAction::Stop => {
            supervisor.shutdown();
            println!("daemons stopped");
            Ok(EXIT_OK)
        }
        ServerAction::Status => {
            let mut table = Table::new(vec![Column::left("DAEMON"), Column::left("REACHABLE"), Column::left("OWNED")]);
            for (name, status) in supervisor.status() {
                table.row(vec![name, status.reachable.to_string(), status.owned.to_string()]);
            }
            let _ = table.render(&mut std::io::stdout());
            Ok(EXIT_OK)
        }
    }
}
