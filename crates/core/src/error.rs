// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Crate-wide error type. See spec.md §7.

use thiserror::Error;

/// Errors surfaced by the turbulence core and its collaborating crates.
#[derive(Debug, Error)]
pub enum TurbulenceError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("no profile-path definition matched connection {conn_id} from {src}")]
    NoMatchingPath { conn_id: u64, src: String },

    #[error(
        "policy denies profile {uri} on ppath {path_name} (conn {conn_id} [{host}:{port}])"
    )]
    PolicyDeny {
        uri: String,
        path_name: String,
        conn_id: u64,
        host: String,
        port: String,
    },

    #[error("failed to spawn child for path {path_name}: {reason}")]
    ChildSpawnFailed { path_name: String, reason: String },

    #[error("parent-child BEEP link lost for child pid {pid}")]
    ChildLinkLost { pid: i32 },

    #[error("module '{name}' failed to initialize: {reason}")]
    ModuleInitFailed { name: String, reason: String },

    #[error("transport fault on descriptor {fd}: {reason}")]
    TransportFault { fd: i32, reason: String },

    #[error("bad expression pattern: {0}")]
    BadPattern(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid utf-8 in wire payload")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("background task panicked or was cancelled: {0}")]
    Join(String),
}
