// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-ppath: the profile-path engine (C6, spec.md §4.6).
//!
//! This is the policy heart of the daemon: [`select`](PPathEngine::select)
//! picks the `PPathDef` governing a newly accepted connection, and
//! [`mask`](PPathEngine::mask) answers, for every channel-start and
//! greetings exchange, whether a profile may run.

mod select;
pub mod mask;
pub mod state;

pub use select::{SelectOutcome, select};
pub use state::PPathState;
pub use mask::{MaskOutcome, PPathEngine};
