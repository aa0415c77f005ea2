// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Signal handler installation (spec.md §4.8): SIGHUP→reload,
//! SIGTERM/SIGINT→shutdown, SIGCHLD→reap in the parent; a reduced
//! SIGTERM-only mask in forked children (spec.md §4.7.1 step 6).

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use crate::context::Context;

/// Install the parent's full signal set and drive reload/shutdown
/// from it. Runs until the process is asked to shut down; the
/// returned `JoinHandle` resolves once that happens.
pub fn spawn_parent_signal_handlers(ctx: Arc<Context>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGHUP handler");
                return;
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sigchld = match signal(SignalKind::child()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGCHLD handler");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    if let Err(e) = ctx.reload().await {
                        warn!(error = %e, "reload failed, previous configuration remains active");
                    }
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received, shutting down");
                    ctx.shutdown().await;
                    return;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received, shutting down");
                    ctx.shutdown().await;
                    return;
                }
                _ = sigchld.recv() => {
                    // spec.md §4.7.3 / §6.5 scenario 6: reap exited
                    // children and free their path-def's child slot
                    // without waiting for the next shutdown/reload.
                    ctx.reap_children();
                }
            }
        }
    })
}

/// Install the reduced mask a forked child runs under: SIGTERM only
/// (spec.md §4.7.3 "the child exits ... or when it receives
/// `SIGTERM`"). SIGHUP/SIGINT are left at their default disposition;
/// reload is a parent-only concept once a connection has been handed
/// off.
pub fn spawn_child_signal_handler(ctx: Arc<Context>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install child SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
        info!("child received SIGTERM, shutting down");
        ctx.shutdown().await;
    })
}
