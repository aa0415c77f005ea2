// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-config: XML configuration store (C2).
//!
//! Parses `<turbulence>` documents into a [`ConfigDoc`], exposes typed
//! accessors used by the rest of the daemon, and holds the attribute
//! alias table consumed by the profile-path engine (spec.md §4.6.3).
//! The live document is held behind an [`ArcSwap`](arc_swap::ArcSwap) so
//! a SIGHUP reload swaps the tree without blocking readers that already
//! hold an `Arc` clone (spec.md §8 scenario 5).

pub mod doc;
pub mod parse;
pub mod store;

pub use doc::{ConfigDoc, GlobalSettings, ModuleConfig};
pub use store::ConfigStore;

/// Compile-time default for [`sysconfdir`], mirroring the original
/// binary's `--conf-location` output (spec.md §6.5).
pub const DEFAULT_SYSCONFDIR: &str = "/etc/turbulence";

/// Where the daemon looks for its configuration tree. Overridable via
/// `TURBULENCE_SYSCONFDIR` so `tbc-cli`'s integration tests don't need
/// to touch `/etc`.
pub fn sysconfdir() -> String {
    std::env::var("TURBULENCE_SYSCONFDIR").unwrap_or_else(|_| DEFAULT_SYSCONFDIR.to_string())
}
