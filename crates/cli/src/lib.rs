// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-cli: argument parsing and exit-code mapping for the `turbulence`
//! binary (spec.md §6.5).
//!
//! `tbc-daemon` owns the orchestrator; this crate only adds the parts a
//! human runs at a shell: flag parsing, `--conf-location`, and mapping
//! startup failures onto the exit codes documented in spec.md §6.5 and
//! §7.

use std::path::PathBuf;
use std::process::ExitCode as StdExitCode;
use std::sync::Arc;

use clap::Parser;
use tbc_daemon::{signals, Context};
use tbc_driver::{BeepDriver, NoopDriver};

/// The `turbulence` BEEP application server.
#[derive(Debug, Parser)]
#[command(name = "turbulence", version)]
pub struct Args {
    /// Path to the `<turbulence>` configuration document.
    #[arg(short = 'c', long = "config", default_value = "turbulence.conf.xml")]
    pub config: PathBuf,

    /// Directory for runtime state: pid file, control sockets.
    #[arg(long = "runtime-dir")]
    pub runtime_dir: Option<PathBuf>,

    /// Print the resolved configuration search directory and exit,
    /// without starting the daemon.
    #[arg(long = "conf-location")]
    pub conf_location: bool,
}

/// Exit codes documented in spec.md §6.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Normal = 0,
    ConfigError = 1,
    BeepEngineInitFailure = 2,
    ModuleInitFailure = 3,
}

impl From<ExitCode> for StdExitCode {
    fn from(code: ExitCode) -> Self {
        StdExitCode::from(code as u8)
    }
}

/// Runs the CLI to completion, returning the exit code to propagate to
/// the shell. Never panics on ordinary failure paths; every fallible
/// step here is a `Result` mapped onto one of the four codes above.
pub async fn run(args: Args) -> ExitCode {
    if args.conf_location {
        println!("{}", tbc_config::sysconfdir());
        return ExitCode::Normal;
    }

    let runtime_dir = args
        .runtime_dir
        .unwrap_or_else(|| std::env::temp_dir().join("turbulence-runtime"));

    let driver: Arc<dyn BeepDriver> = Arc::new(NoopDriver);
    let ctx = match Context::new(args.config, runtime_dir, driver) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "failed to start: configuration invalid");
            return ExitCode::ConfigError;
        }
    };

    ctx.mark_started();
    tracing::info!("turbulence started");
    signals::spawn_parent_signal_handlers(ctx.clone());
    ctx.wait_for_shutdown().await;

    ExitCode::Normal
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
