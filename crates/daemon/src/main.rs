// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! `turbulenced`: the raw orchestrator binary, with no CLI argument
//! parsing beyond a config path. `tbc-cli`'s `turbulence` binary is
//! the user-facing entrypoint (spec.md §6.5); this one exists for
//! running the daemon directly in development and in the
//! `tests/specs.rs` integration harness.

use std::path::PathBuf;
use std::sync::Arc;

use tbc_daemon::{signals, Context};
use tbc_driver::{BeepDriver, NoopDriver};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let conf_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/etc/turbulence/turbulence.conf.xml"));
    let runtime_dir = std::env::temp_dir().join("turbulence-runtime");

    let driver: Arc<dyn BeepDriver> = Arc::new(NoopDriver);
    let ctx = match Context::new(conf_path, runtime_dir, driver) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "failed to start: configuration invalid");
            return std::process::ExitCode::from(1);
        }
    };

    ctx.mark_started();
    tracing::info!("turbulenced started");
    signals::spawn_parent_signal_handlers(ctx.clone());
    ctx.wait_for_shutdown().await;

    std::process::ExitCode::SUCCESS
}
