// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! tbc-driver: the `BeepDriver` trait boundary (spec.md §6.2).
//!
//! `tbc-ppath`, `tbc-conn`, and `tbc-supervisor` are written against this
//! trait, never against a concrete BEEP engine binding, so the core can
//! be exercised in tests without a live RFC 3080 stack attached. A real
//! binding (out of scope here) would implement `BeepDriver` over
//! whichever vortex-equivalent crate the daemon links.

pub mod attrs;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod noop;

pub use attrs::ConnAttrs;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDriver;
pub use noop::NoopDriver;

use async_trait::async_trait;
use tbc_core::error::TurbulenceError;
use tbc_core::id::ConnId;
use std::time::Duration;

/// Opaque reference to a live channel, as handed back by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelRef(pub u32);

/// The capability set the profile-path engine and connection manager
/// need from a concrete BEEP engine binding (spec.md §6.2). The core
/// never assumes a specific threading model of the driver, hence
/// `Send + Sync` bounds and `async_trait` rather than borrowing a
/// driver-specific runtime handle.
#[async_trait]
pub trait BeepDriver: Send + Sync {
    /// URIs of every profile the engine currently has registered
    /// (not necessarily running on any one connection).
    fn registered_profiles(&self) -> Vec<String>;

    /// A running channel on `conn` advertising `uri`, if any.
    fn channel_by_uri(&self, conn: ConnId, uri: &str) -> Option<ChannelRef>;

    /// Count of currently open channels on `conn` running `uri`
    /// (spec.md §9: `max_per_conn` counts currently-open channels).
    fn channel_count(&self, conn: ConnId, uri: &str) -> u32;

    /// Read a previously-set typed attribute off `conn`'s attribute bag.
    fn get_attr(&self, conn: ConnId, key: &str) -> Option<String>;

    /// Set a typed attribute on `conn`'s attribute bag.
    fn set_attr(&self, conn: ConnId, key: &str, value: &str);

    /// Re-drive a channel-zero start reply (spec.md §4.6.4, §6.4
    /// position 11 last byte): used when the deferred reply must be
    /// re-executed inside a forked child after privilege drop.
    async fn channel_zero_handle_start_reply(
        &self,
        conn: ConnId,
        channel_num: u32,
        profile: &str,
        content: &[u8],
        server_name: Option<&str>,
    ) -> Result<bool, TurbulenceError>;

    /// Block until all pending replies on `conn` have been flushed to
    /// the wire, or `timeout` elapses (spec.md §6.2, used by
    /// `tbc-supervisor` before tearing down a parent-side link).
    async fn block_until_replies_sent(&self, conn: ConnId, timeout: Duration) -> bool;

    /// Close `conn` from the driver side.
    fn shutdown_connection(&self, conn: ConnId);
}
