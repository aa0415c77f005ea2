// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-evloop: the descriptor loop (C3, spec.md §4.3).
//!
//! A single-threaded, cooperatively scheduled readiness loop holding a
//! dynamic set of `(fd, on_read, ctx1, ctx2)` entries. Registration
//! comes through a wait-free multi-producer inbox so any thread
//! (including a tokio worker) can register/unregister a descriptor
//! without touching the loop's own thread.

mod descloop;
mod msg;

pub use descloop::DescriptorLoop;
pub use msg::{LoopMsg, OnRead};
