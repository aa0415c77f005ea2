// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-module: module host (C5, spec.md §4.5, §6.3).

pub mod def;
pub mod host;

pub use def::ModuleDef;
pub use host::{LoadedModule, ModuleHost};
