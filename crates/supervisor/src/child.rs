// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! A supervised child process (spec.md §3 `Child`, §4.7.3).

use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use nix::unistd::Pid;
use parking_lot::Mutex;
use tbc_core::ppath::PathId;

/// One process forked off to own a `separate=yes` path's connections.
/// Invariant (spec.md §3): while `refcount() > 0` the control socket is
/// open and the child's descriptor loop is running.
pub struct Child {
    pub pid: Pid,
    pub def_id: PathId,
    pub server_name: Option<String>,
    pub control_socket_path: PathBuf,
    pub reuse: bool,
    control_stream: Mutex<UnixStream>,
    refcount: AtomicU32,
}

impl Child {
    pub fn new(
        pid: Pid,
        def_id: PathId,
        server_name: Option<String>,
        control_socket_path: PathBuf,
        control_stream: UnixStream,
        reuse: bool,
    ) -> Self {
        Self {
            pid,
            def_id,
            server_name,
            control_socket_path,
            reuse,
            control_stream: Mutex::new(control_stream),
            refcount: AtomicU32::new(1),
        }
    }

    pub fn refcount(&self) -> u32 {
        self.refcount.load(Ordering::SeqCst)
    }

    pub fn incref(&self) {
        self.refcount.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the refcount after decrementing, for the caller to
    /// decide whether the child should now be reaped.
    pub fn decref(&self) -> u32 {
        self.refcount
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Whether `server_name` matches this child's bound serverName, for
    /// reuse lookup (spec.md §4.7.4): `None` on the child side means
    /// "accepts any serverName".
    pub fn matches_reuse(&self, def_id: PathId, server_name: Option<&str>) -> bool {
        self.reuse && self.def_id == def_id && self.server_name.as_deref() == server_name
    }

    pub fn with_control_stream<R>(&self, f: impl FnOnce(&mut UnixStream) -> R) -> R {
        let mut guard = self.control_stream.lock();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decref_never_underflows_past_zero() {
        let (a, _b) = UnixStream::pair().expect("pair");
        let child = Child::new(Pid::from_raw(1), 1, None, PathBuf::new(), a, false);
        assert_eq!(child.decref(), 0);
        assert_eq!(child.decref(), 0);
    }

    #[test]
    fn matches_reuse_requires_matching_def_and_server_name() {
        let (a, _b) = UnixStream::pair().expect("pair");
        let child = Child::new(
            Pid::from_raw(1),
            7,
            Some("core-admin".to_string()),
            PathBuf::new(),
            a,
            true,
        );
        assert!(child.matches_reuse(7, Some("core-admin")));
        assert!(!child.matches_reuse(7, Some("other")));
        assert!(!child.matches_reuse(8, Some("core-admin")));
    }

    #[test]
    fn a_non_reuse_child_never_matches() {
        let (a, _b) = UnixStream::pair().expect("pair");
        let child = Child::new(Pid::from_raw(1), 7, None, PathBuf::new(), a, false);
        assert!(!child.matches_reuse(7, None));
    }
}
