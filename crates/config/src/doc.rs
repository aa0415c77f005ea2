// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Parsed configuration tree (spec.md §4.2).

use std::path::PathBuf;
use std::sync::Arc;

use tbc_core::ppath::{AttrAlias, PPath};

/// `<global-settings>`: the handful of process-wide knobs the original
/// keeps flat rather than nested, e.g. `kill-childs-on-exit` (spec.md §9
/// item 3) and the PID file location.
#[derive(Debug, Clone, Default)]
pub struct GlobalSettings {
    pub pid_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub socket_dir: Option<PathBuf>,
    pub kill_childs_on_exit: bool,
    pub clean_start: bool,
    pub no_detach: bool,
}

/// One `<module>` (or `<directory>`) entry under `<modules>`.
#[derive(Debug, Clone)]
pub enum ModuleConfig {
    File(PathBuf),
    Directory(PathBuf),
}

/// The full parsed document: global settings, module search list,
/// profile-path tree, and the attribute-alias table built while walking
/// `<features>` (or, in the absence of a dedicated element, populated
/// programmatically by modules that register a tuning profile).
///
/// `ppath` and `attr_alias` are individually `Arc`-wrapped, not just
/// the document as a whole: `tbc-ppath::PPathEngine` is constructed
/// from these two independently of the rest of the document, and a
/// cheap refcount bump is all that should cost when wiring it up after
/// a reload.
#[derive(Debug, Default)]
pub struct ConfigDoc {
    pub global: GlobalSettings,
    pub modules: Vec<ModuleConfig>,
    pub ppath: Arc<PPath>,
    pub attr_alias: Arc<AttrAlias>,
}
