// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The mask algorithm (spec.md §4.6.2) and the engine that ties
//! selection, masking, and tuning aliases (§4.6.3) together against a
//! live [`BeepDriver`].

use std::sync::Arc;

use dashmap::DashMap;
use tbc_core::error::TurbulenceError;
use tbc_core::id::ConnId;
use tbc_core::ppath::{AttrAlias, PPath, PPathDef, PPathItem, PPathItemKind, PathId};
use tbc_driver::BeepDriver;
use tracing::info;

use crate::select::{select, SelectOutcome};
use crate::state::PPathState;

/// Outcome of a single mask evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskOutcome {
    Allow,
    Deny { error: Option<String> },
}

/// Ties a `PPath`, its attribute-alias table, and a `BeepDriver`
/// together with per-connection `PPathState`. One engine instance lives
/// for the life of a config generation; a SIGHUP reload constructs a
/// fresh engine around the newly loaded `Arc<ConfigDoc>` (spec.md §8
/// scenario 5) while connections already dispatched keep their
/// existing engine/def via `Arc` clone.
pub struct PPathEngine {
    ppath: Arc<PPath>,
    attr_alias: Arc<AttrAlias>,
    driver: Arc<dyn BeepDriver>,
    states: DashMap<ConnId, PPathState>,
}

impl PPathEngine {
    pub fn new(ppath: Arc<PPath>, attr_alias: Arc<AttrAlias>, driver: Arc<dyn BeepDriver>) -> Self {
        Self {
            ppath,
            attr_alias,
            driver,
            states: DashMap::new(),
        }
    }

    /// Selection (spec.md §4.6.1). Installs `PPathState` on success.
    pub fn select_connection(
        &self,
        conn: ConnId,
        src: &str,
        dst: &str,
    ) -> Result<SelectOutcome, TurbulenceError> {
        let outcome = select(&self.ppath, src, dst).ok_or_else(|| TurbulenceError::NoMatchingPath {
            conn_id: conn.0,
            src: src.to_string(),
        })?;

        let def_id = match outcome {
            SelectOutcome::InProcess(id) | SelectOutcome::Separate(id) => id,
        };
        self.states.insert(conn, PPathState::new(def_id));
        Ok(outcome)
    }

    pub fn forget_connection(&self, conn: ConnId) {
        self.states.remove(&conn);
    }

    pub fn def_for(&self, conn: ConnId) -> Option<PathId> {
        self.states.get(&conn).map(|s| s.def_id)
    }

    /// Current live-child count for `def_id` (spec.md §3
    /// `children_running`), or 0 if the id is unknown.
    pub fn children_running(&self, def_id: PathId) -> u32 {
        self.ppath.by_id(def_id).map(|d| d.children_running()).unwrap_or(0)
    }

    /// Check-and-reserve a child slot before forking for `def_id`
    /// (spec.md §4.7.1 precondition). `global_limit` is `Context`'s
    /// process-wide default, used when the def doesn't set its own.
    pub fn try_reserve_child_slot(&self, def_id: PathId, global_limit: u32) -> Result<(), TurbulenceError> {
        self.ppath
            .by_id(def_id)
            .ok_or_else(|| TurbulenceError::ChildSpawnFailed {
                path_name: format!("#{def_id}"),
                reason: "unknown path-def id".to_string(),
            })?
            .try_reserve_child_slot(global_limit)
    }

    /// Release a slot reserved by `try_reserve_child_slot`: called on
    /// an immediately-failed spawn, or when the parent reaps an exited
    /// child on `SIGCHLD`.
    pub fn release_child_slot(&self, def_id: PathId) {
        if let Some(def) = self.ppath.by_id(def_id) {
            def.release_child_slot();
        }
    }

    /// The mask function itself (spec.md §4.6.2). `channel_num == -1`
    /// is the greetings phase: a denial never surfaces an error string,
    /// matching the original's "errors are never reported outward"
    /// rule.
    pub fn mask(
        &self,
        conn: ConnId,
        channel_num: i32,
        uri: &str,
        server_name: Option<&str>,
    ) -> MaskOutcome {
        let Some(def_id) = self.def_for(conn) else {
            return MaskOutcome::Deny { error: None };
        };
        let Some(def) = self.ppath.by_id(def_id) else {
            return MaskOutcome::Deny { error: None };
        };

        let allowed = self.mask_items(conn, &def.items, def, channel_num, uri, server_name);

        if allowed {
            if channel_num > 0 {
                info!(
                    conn = conn.0,
                    uri,
                    ppath = def.name.as_deref().unwrap_or("(unnamed)"),
                    "access"
                );
            }
            return MaskOutcome::Allow;
        }

        if channel_num > 0 {
            let err = TurbulenceError::PolicyDeny {
                uri: uri.to_string(),
                path_name: def.name.clone().unwrap_or_else(|| "(unnamed)".to_string()),
                conn_id: conn.0,
                host: String::new(),
                port: String::new(),
            };
            MaskOutcome::Deny {
                error: Some(err.to_string()),
            }
        } else {
            MaskOutcome::Deny { error: None }
        }
    }

    fn mask_items(
        &self,
        conn: ConnId,
        items: &[PPathItem],
        def: &PPathDef,
        channel_num: i32,
        uri: &str,
        server_name: Option<&str>,
    ) -> bool {
        // Step 1: direct allow scan.
        for item in items {
            if !item.profile.matches(uri) {
                continue;
            }
            if let Some(preconnmark) = &item.preconnmark {
                if self.driver.get_attr(conn, preconnmark).is_none() {
                    continue;
                }
            }
            if item.max_per_conn > 0 && self.driver.channel_count(conn, uri) >= item.max_per_conn {
                continue;
            }
            if channel_num > 0 && !self.bind_server_name(conn, def, server_name) {
                return false;
            }
            return true;
        }

        // Step 2: conditional descent over <if-success> items.
        for item in items {
            if item.kind != PPathItemKind::IfSuccess {
                continue;
            }
            let any_running = self
                .driver
                .registered_profiles()
                .iter()
                .filter(|registered| item.profile.matches(registered))
                .any(|registered| self.is_running(conn, registered));
            if !any_running {
                continue;
            }
            if let Some(connmark) = &item.connmark {
                if self.driver.get_attr(conn, connmark).is_none() {
                    continue;
                }
            }
            if self.mask_items(conn, &item.children, def, channel_num, uri, server_name) {
                return true;
            }
        }

        false
    }

    /// A profile counts as "running" either through a live channel or,
    /// after a tuning reset drops all channels (RFC 3080 §2.3.1.3),
    /// through its aliased connection attribute (spec.md §4.6.3).
    fn is_running(&self, conn: ConnId, uri: &str) -> bool {
        if self.driver.channel_count(conn, uri) > 0 {
            return true;
        }
        match self.attr_alias.attr_for(uri) {
            Some(attr_key) => self.driver.get_attr(conn, attr_key).is_some(),
            None => false,
        }
    }

    /// ServerName binding is irreversible within a connection (spec.md
    /// §4.6.2 step 1). The first channel-start that exercises a
    /// `server_name`-bearing def fixes the requested value; every later
    /// channel-start must present the same value, even if a later def's
    /// expression would also accept it.
    fn bind_server_name(&self, conn: ConnId, def: &PPathDef, server_name: Option<&str>) -> bool {
        let requested = server_name.unwrap_or("");
        let Some(mut state) = self.states.get_mut(&conn) else {
            return false;
        };

        if let Some(bound) = &state.server_name {
            return bound == requested;
        }

        if let Some(expr) = &def.server_name {
            if !expr.matches(requested) {
                return false;
            }
        }

        state.server_name = Some(requested.to_string());
        true
    }
}

#[cfg(test)]
#[path = "mask_tests.rs"]
mod tests;
