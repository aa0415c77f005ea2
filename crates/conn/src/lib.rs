// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-conn: connection manager (C4, spec.md §4.4).
//!
//! Holds one [`ConnRecord`] per registered connection in a
//! `DashMap<ConnId, ConnRecord>`, keyed by the driver's opaque id.
//! Thread-safe with no ordering guarantee between concurrent
//! registrations; increments/decrements on one connection's record are
//! atomic relative to each other, matching spec.md §4.4/§5.

use dashmap::DashMap;
use std::collections::HashMap;
use tbc_core::id::ConnId;

/// A role filter for [`ConnManager::list`]. `-1` in the original maps to
/// `RoleFilter::Any` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFilter {
    Any,
    Role(i32),
}

/// Per-connection bookkeeping: which profiles are currently running and
/// how many channels each has open.
#[derive(Debug, Default, Clone)]
pub struct ConnRecord {
    pub role: i32,
    profile_counts: HashMap<String, u32>,
}

impl ConnRecord {
    pub fn new(role: i32) -> Self {
        Self {
            role,
            profile_counts: HashMap::new(),
        }
    }

    pub fn profile_running(&self, uri: &str) -> bool {
        self.profile_counts.get(uri).is_some_and(|&n| n > 0)
    }

    pub fn profile_count(&self, uri: &str) -> u32 {
        self.profile_counts.get(uri).copied().unwrap_or(0)
    }

    fn channel_added(&mut self, uri: &str) {
        *self.profile_counts.entry(uri.to_string()).or_insert(0) += 1;
    }

    fn channel_removed(&mut self, uri: &str) {
        if let Some(count) = self.profile_counts.get_mut(uri) {
            *count = count.saturating_sub(1);
        }
    }

    fn reset(&mut self) {
        self.profile_counts.clear();
    }
}

/// The registry itself.
#[derive(Default)]
pub struct ConnManager {
    conns: DashMap<ConnId, ConnRecord>,
}

impl ConnManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn: ConnId, role: i32) {
        self.conns.insert(conn, ConnRecord::new(role));
    }

    pub fn unregister(&self, conn: ConnId) {
        self.conns.remove(&conn);
    }

    pub fn list(&self, role: RoleFilter) -> Vec<ConnId> {
        self.conns
            .iter()
            .filter(|entry| match role {
                RoleFilter::Any => true,
                RoleFilter::Role(r) => entry.value().role == r,
            })
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn profile_running(&self, conn: ConnId, uri: &str) -> bool {
        self.conns
            .get(&conn)
            .map(|rec| rec.profile_running(uri))
            .unwrap_or(false)
    }

    pub fn profile_count(&self, conn: ConnId, uri: &str) -> u32 {
        self.conns
            .get(&conn)
            .map(|rec| rec.profile_count(uri))
            .unwrap_or(0)
    }

    /// Channel-added observer (spec.md §4.4 "ids for channel-added /
    /// channel-removed observers" — here a direct callback since the
    /// manager is the sole subscriber within this workspace).
    pub fn on_channel_added(&self, conn: ConnId, uri: &str) {
        if let Some(mut rec) = self.conns.get_mut(&conn) {
            rec.channel_added(uri);
        }
    }

    pub fn on_channel_removed(&self, conn: ConnId, uri: &str) {
        if let Some(mut rec) = self.conns.get_mut(&conn) {
            rec.channel_removed(uri);
        }
    }

    /// Called after a tuning profile succeeds: every live channel on
    /// `conn` is dropped by RFC 3080 §2.3.1.3 (spec.md §4.6.3).
    pub fn on_tuning_reset(&self, conn: ConnId) {
        if let Some(mut rec) = self.conns.get_mut(&conn) {
            rec.reset();
        }
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.conns.contains_key(&conn)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
