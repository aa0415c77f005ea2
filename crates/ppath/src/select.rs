// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Selection (spec.md §4.6.1): choosing the `PPathDef` that governs a
//! newly accepted connection.

use tbc_core::ppath::{PPath, PathId};

/// Result of selecting a path for a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Continue handling the connection in the current process.
    InProcess(PathId),
    /// `def.separate = true`: hand the connection to the supervisor and
    /// tell the driver not to accept it in the parent.
    Separate(PathId),
}

/// Walk `path.defs` in order and accept the first whose `src`/`dst`
/// match (property P1: selection is a deterministic function of
/// `(src, dst)` and document order). `None` means no definition
/// matched; the caller (which knows the connection id) turns that into
/// a `NoMatchingPath` error.
pub fn select(path: &PPath, src: &str, dst: &str) -> Option<SelectOutcome> {
    let def = path.select(src, dst)?;
    Some(if def.separate {
        SelectOutcome::Separate(def.id)
    } else {
        SelectOutcome::InProcess(def.id)
    })
}

#[cfg(test)]
#[path = "select_tests.rs"]
mod tests;
