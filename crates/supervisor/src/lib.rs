// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-supervisor: the process supervisor (C7, spec.md §4.7).
//!
//! Owns the one genuinely unsafe seam in the workspace: `fork()` plus
//! `SCM_RIGHTS` fd passing over a Unix-domain control socket. Engine
//! reinitialization, module notification, and orchestrator rewiring
//! after a fork are the caller's (`tbc-daemon`'s) responsibility; this
//! crate hands back a decoded [`ChildHandoff`] and stops there, which
//! keeps `unsafe` scoped to exactly the fork/fd-passing primitives.

pub mod child;
pub mod control_socket;
pub mod privilege;
pub mod proxy;
pub mod registry;
pub mod spawn;

pub use child::Child;
pub use registry::ChildRegistry;
pub use proxy::FdProxy;
pub use spawn::{hand_off_to_existing_child, spawn_child, ChildHandoff, ForkOutcome, SpawnRequest};
