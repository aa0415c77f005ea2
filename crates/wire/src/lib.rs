// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-wire: the parent→child handover wire format (spec.md §6.4).
//!
//! The control socket carries exactly one framed message per handed-off
//! connection: a length-prefixed, `;_;`-joined init string, with the
//! connection's own socket passed alongside as an `SCM_RIGHTS`
//! ancillary message (handled by `tbc-supervisor`, which owns the raw
//! `sendmsg`/`recvmsg` calls — this crate only knows about the text
//! payload and its framing).

mod frame;
mod init_string;

pub use frame::{read_framed, read_framed_sync, write_framed, write_framed_sync, MAX_FRAME_LEN};
pub use init_string::{ConnStatus, InitString};
