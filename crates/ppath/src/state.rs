// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Per-connection profile-path state (spec.md §3 `PPathState`).

use tbc_core::ppath::PathId;

/// Attached to a connection once [`select`](crate::select) picks its
/// governing `PPathDef`. `server_name` starts `None` and is bound at
/// most once: the first successful channel-start whose def carries a
/// `server_name` expression fixes it for the life of the connection
/// (spec.md §4.6.2 step 1, "ServerName binding is irreversible").
#[derive(Debug, Clone)]
pub struct PPathState {
    pub def_id: PathId,
    pub server_name: Option<String>,
}

impl PPathState {
    pub fn new(def_id: PathId) -> Self {
        Self {
            def_id,
            server_name: None,
        }
    }
}
