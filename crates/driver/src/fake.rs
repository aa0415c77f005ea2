// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! `FakeDriver`: an in-memory `BeepDriver` used by tests across the
//! workspace (spec.md §8 scenarios are driven against this rather than
//! a live BEEP stack).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tbc_core::error::TurbulenceError;
use tbc_core::id::ConnId;

use crate::attrs::ConnAttrs;
use crate::{BeepDriver, ChannelRef};

#[derive(Default)]
struct ConnState {
    attrs: ConnAttrs,
    channels: HashMap<String, Vec<ChannelRef>>,
    shutdown: bool,
}

/// A single-process, in-memory stand-in for a BEEP engine.
pub struct FakeDriver {
    registered: Mutex<Vec<String>>,
    conns: DashMap<ConnId, ConnState>,
    next_channel: AtomicU32,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            registered: Mutex::new(Vec::new()),
            conns: DashMap::new(),
            next_channel: AtomicU32::new(1),
        }
    }

    /// Advertise `uri` in `registered_profiles()`.
    pub fn register_profile(&self, uri: impl Into<String>) {
        self.registered.lock().push(uri.into());
    }

    /// Simulate a channel-start completing successfully: bumps the
    /// per-connection channel count for `uri` and returns the new
    /// `ChannelRef`.
    pub fn open_channel(&self, conn: ConnId, uri: &str) -> ChannelRef {
        let channel = ChannelRef(self.next_channel.fetch_add(1, Ordering::Relaxed));
        self.conns
            .entry(conn)
            .or_default()
            .channels
            .entry(uri.to_string())
            .or_default()
            .push(channel);
        channel
    }

    /// Simulate a tuning reset (e.g. successful TLS/SASL negotiation):
    /// every live channel on `conn` is dropped, mirroring RFC 3080
    /// §2.3.1.3.
    pub fn reset_channels(&self, conn: ConnId) {
        if let Some(mut state) = self.conns.get_mut(&conn) {
            state.channels.clear();
        }
    }

    pub fn is_shutdown(&self, conn: ConnId) -> bool {
        self.conns.get(&conn).map(|s| s.shutdown).unwrap_or(false)
    }
}

#[async_trait]
impl BeepDriver for FakeDriver {
    fn registered_profiles(&self) -> Vec<String> {
        self.registered.lock().clone()
    }

    fn channel_by_uri(&self, conn: ConnId, uri: &str) -> Option<ChannelRef> {
        self.conns.get(&conn)?.channels.get(uri)?.first().copied()
    }

    fn channel_count(&self, conn: ConnId, uri: &str) -> u32 {
        self.conns
            .get(&conn)
            .and_then(|s| s.channels.get(uri).map(|v| v.len() as u32))
            .unwrap_or(0)
    }

    fn get_attr(&self, conn: ConnId, key: &str) -> Option<String> {
        self.conns.get(&conn)?.attrs.get(key).map(str::to_string)
    }

    fn set_attr(&self, conn: ConnId, key: &str, value: &str) {
        self.conns.entry(conn).or_default().attrs.set(key, value);
    }

    async fn channel_zero_handle_start_reply(
        &self,
        _conn: ConnId,
        _channel_num: u32,
        _profile: &str,
        _content: &[u8],
        _server_name: Option<&str>,
    ) -> Result<bool, TurbulenceError> {
        Ok(true)
    }

    async fn block_until_replies_sent(&self, _conn: ConnId, _timeout: Duration) -> bool {
        true
    }

    fn shutdown_connection(&self, conn: ConnId) {
        if let Some(mut state) = self.conns.get_mut(&conn) {
            state.shutdown = true;
        }
    }
}
