// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Profile-path document types (C6 data model). See spec.md §3.
//!
//! These types are produced once by `tbc-config` at load time and are
//! otherwise immutable for the life of the process; they are wrapped in
//! `Arc` by callers so a connection (or a forked child) can hold a stable
//! reference across a config reload (spec.md §8 scenario 5).

use crate::error::TurbulenceError;
use crate::expr::Expr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Stable, document-order identifier for a `PPathDef`, assigned starting
/// at 1 (spec.md §3).
pub type PathId = u32;

/// One rule node in a profile-path's policy tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PPathItemKind {
    Allow,
    IfSuccess,
}

/// A recursive policy-tree node. See spec.md §3 `PPathItem`.
#[derive(Debug)]
pub struct PPathItem {
    pub kind: PPathItemKind,
    pub profile: Expr,
    pub connmark: Option<String>,
    pub preconnmark: Option<String>,
    pub max_per_conn: u32,
    pub children: Vec<PPathItem>,
}

impl PPathItem {
    /// Construct an `Allow` item. Returns `ConfigInvalid` if `children`
    /// is non-empty: an `Allow` with children is rejected at load
    /// (spec.md §3 invariant, §9 Open Questions).
    pub fn allow(
        profile: Expr,
        connmark: Option<String>,
        preconnmark: Option<String>,
        max_per_conn: u32,
    ) -> Result<Self, TurbulenceError> {
        Ok(Self {
            kind: PPathItemKind::Allow,
            profile,
            connmark,
            preconnmark,
            max_per_conn,
            children: Vec::new(),
        })
    }

    /// Construct an `IfSuccess` item. Zero children is allowed (then
    /// equivalent to `Allow`, per spec.md §3).
    pub fn if_success(
        profile: Expr,
        connmark: Option<String>,
        preconnmark: Option<String>,
        max_per_conn: u32,
        children: Vec<PPathItem>,
    ) -> Self {
        Self {
            kind: PPathItemKind::IfSuccess,
            profile,
            connmark,
            preconnmark,
            max_per_conn,
            children,
        }
    }

    /// Validate the load-time invariant: `Allow` nodes must not carry
    /// children. Checked recursively.
    pub fn validate(&self) -> Result<(), TurbulenceError> {
        if self.kind == PPathItemKind::Allow && !self.children.is_empty() {
            return Err(TurbulenceError::ConfigInvalid(
                "<allow> item must not have children; use <if-success> instead".to_string(),
            ));
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }
}

/// A named policy branch. See spec.md §3 `PPathDef`.
#[derive(Debug)]
pub struct PPathDef {
    pub id: PathId,
    pub name: Option<String>,
    pub server_name: Option<Expr>,
    pub src: Option<Expr>,
    pub dst: Option<Expr>,
    pub items: Vec<PPathItem>,
    pub user_id: Option<u32>,
    pub group_id: Option<u32>,
    pub separate: bool,
    pub reuse: bool,
    pub chroot: Option<std::path::PathBuf>,
    pub work_dir: Option<std::path::PathBuf>,
    pub child_limit: i32,
    /// Parent-only count of live children forked for this definition
    /// (spec.md §3); invariant `children_running() <= effective_limit`.
    /// An atomic rather than a mutex since `PPathDef` is otherwise
    /// immutable after load and shared via `Arc` across connections.
    children_running: AtomicU32,
}

impl PPathDef {
    /// `src`/`dst` match with "absent expression never blocks" semantics
    /// (spec.md §4.6.1, mirroring `original_source/src/turbulence-ppath.c`
    /// `__turbulence_ppath_handle_connection_match_src`).
    pub fn matches_src(&self, src: &str) -> bool {
        self.src.as_ref().map_or(true, |e| e.matches(src))
    }

    pub fn matches_dst(&self, dst: &str) -> bool {
        self.dst.as_ref().map_or(true, |e| e.matches(dst))
    }

    pub fn validate(&self) -> Result<(), TurbulenceError> {
        for item in &self.items {
            item.validate()?;
        }
        if self.group_id.is_some() && self.user_id.is_none() {
            return Err(TurbulenceError::ConfigInvalid(format!(
                "path-def '{}': run-as-group requires run-as-user",
                self.name.as_deref().unwrap_or("(unnamed)")
            )));
        }
        Ok(())
    }

    /// `child_limit` if explicitly set, otherwise the process-wide
    /// default (spec.md §3: `child_limit: i32 = -1` means inherit
    /// global).
    pub fn effective_limit(&self, global_limit: u32) -> u32 {
        if self.child_limit < 0 {
            global_limit
        } else {
            self.child_limit as u32
        }
    }

    pub fn children_running(&self) -> u32 {
        self.children_running.load(Ordering::SeqCst)
    }

    /// Atomically check-and-increment the precondition spec.md §4.7.1
    /// requires before forking: `children_running < effective_limit`.
    /// Fails with `ChildSpawnFailed` rather than let a `separate` path
    /// fork without bound.
    pub fn try_reserve_child_slot(&self, global_limit: u32) -> Result<(), TurbulenceError> {
        let limit = self.effective_limit(global_limit);
        self.children_running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < limit).then_some(n + 1))
            .map(|_| ())
            .map_err(|_| TurbulenceError::ChildSpawnFailed {
                path_name: self.name.clone().unwrap_or_else(|| "(unnamed)".to_string()),
                reason: format!("child limit {limit} reached"),
            })
    }

    /// Release a slot reserved by `try_reserve_child_slot`: called when
    /// a reservation's fork/handoff ultimately failed, or when the
    /// parent reaps an exited child on `SIGCHLD` (spec.md §4.7.3).
    pub fn release_child_slot(&self) {
        let _ = self
            .children_running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
    }
}

/// The ordered list of path definitions. Evaluation order: first match
/// wins (spec.md §3).
#[derive(Debug, Default)]
pub struct PPath {
    pub defs: Vec<PPathDef>,
}

impl PPath {
    /// Select the first `PPathDef` whose `src`/`dst` match, per spec.md
    /// §4.6.1 and property P1.
    pub fn select(&self, src: &str, dst: &str) -> Option<&PPathDef> {
        self.defs
            .iter()
            .find(|def| def.matches_src(src) && def.matches_dst(dst))
    }

    pub fn by_id(&self, id: PathId) -> Option<&PPathDef> {
        self.defs.iter().find(|d| d.id == id)
    }

    pub fn validate(&self) -> Result<(), TurbulenceError> {
        self.defs.iter().try_for_each(PPathDef::validate)
    }
}

/// Process-wide mapping *profile-URI → connection-attribute-key*
/// (spec.md §3 `AttrAlias`). After a tuning reset the matched channel
/// disappears; the alias lets the engine treat "attribute X set on the
/// connection" as equivalent to "profile Y running" (spec.md §4.6.3).
#[derive(Debug, Default, Clone)]
pub struct AttrAlias {
    by_uri: HashMap<String, String>,
}

impl AttrAlias {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, uri: impl Into<String>, attr_key: impl Into<String>) {
        self.by_uri.insert(uri.into(), attr_key.into());
    }

    pub fn attr_for(&self, uri: &str) -> Option<&str> {
        self.by_uri.get(uri).map(String::as_str)
    }
}

#[cfg(test)]
#[path = "ppath_tests.rs"]
mod tests;
