// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Opaque identifiers shared across crates.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque per-process connection identifier, assigned by the BEEP driver
/// and threaded through the core unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

impl ConnId {
    /// Allocate a fresh id. Used by `FakeDriver` and tests; production
    /// driver implementations use the BEEP engine's own connection id.
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}
