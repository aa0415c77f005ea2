// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-storage: the small append-only list store (C9, spec.md §3
//! `ListStore`). Modules reach for this instead of an ORM or an
//! embedded database for things like remote-admin allow-lists; it is
//! deliberately nothing more than a mutex-guarded, mtime-checked
//! newline-delimited file.

mod list;

pub use list::ListStore;
