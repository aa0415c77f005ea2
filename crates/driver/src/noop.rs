// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! `NoopDriver`: the production default `BeepDriver`, used when the
//! binary hasn't been linked against a real BEEP engine binding.
//!
//! Implementing an actual RFC 3080/3081 stack is out of scope here
//! (spec.md §1 Non-goals); this type is the seam a real binding plugs
//! into — it satisfies the trait so `tbc-daemon` has something to
//! construct a `Context` around, and logs loudly on every call so a
//! deployment running with it by mistake is obvious in the logs
//! rather than silently accepting connections nobody answers.

use std::time::Duration;

use async_trait::async_trait;
use tbc_core::id::ConnId;
use tbc_core::error::TurbulenceError;
use tracing::warn;

use crate::{BeepDriver, ChannelRef};

#[derive(Debug, Default)]
pub struct NoopDriver;

#[async_trait]
impl BeepDriver for NoopDriver {
    fn registered_profiles(&self) -> Vec<String> {
        Vec::new()
    }

    fn channel_by_uri(&self, _conn: ConnId, _uri: &str) -> Option<ChannelRef> {
        None
    }

    fn channel_count(&self, _conn: ConnId, _uri: &str) -> u32 {
        0
    }

    fn get_attr(&self, _conn: ConnId, _key: &str) -> Option<String> {
        None
    }

    fn set_attr(&self, _conn: ConnId, _key: &str, _value: &str) {
        warn!("NoopDriver::set_attr called with no BEEP engine binding configured");
    }

    async fn channel_zero_handle_start_reply(
        &self,
        _conn: ConnId,
        _channel_num: u32,
        _profile: &str,
        _content: &[u8],
        _server_name: Option<&str>,
    ) -> Result<bool, TurbulenceError> {
        warn!("NoopDriver::channel_zero_handle_start_reply called with no BEEP engine binding configured");
        Ok(false)
    }

    async fn block_until_replies_sent(&self, _conn: ConnId, _timeout: Duration) -> bool {
        true
    }

    fn shutdown_connection(&self, _conn: ConnId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn advertises_no_profiles_and_no_channels() {
        let driver = NoopDriver;
        let conn = ConnId::next();
        assert!(driver.registered_profiles().is_empty());
        assert_eq!(driver.channel_count(conn, "urn:x"), 0);
        assert!(driver.channel_by_uri(conn, "urn:x").is_none());
    }
}
