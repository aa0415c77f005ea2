// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The inbox message sum type (spec.md §4.3, DESIGN NOTES).

use std::os::unix::io::RawFd;

/// Called with `(fd, ctx1, ctx2)` when `fd` becomes readable. Returning
/// `false` drops the descriptor from the loop.
pub type OnRead = Box<dyn FnMut(RawFd, u64, u64) -> bool + Send>;

/// The three message kinds the loop's inbox carries (spec.md §4.3).
pub enum LoopMsg {
    Add {
        fd: RawFd,
        on_read: OnRead,
        ctx1: u64,
        ctx2: u64,
    },
    /// `reply`, if present, is sent once the descriptor has actually
    /// left the poll set — used for a synchronous unregister.
    Remove {
        fd: RawFd,
        reply: Option<crossbeam_channel::Sender<()>>,
    },
    Stop,
}
