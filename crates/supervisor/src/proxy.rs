// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Bidirectional fd proxy for connections flagged `tbc:proxy:conn`
//! (spec.md §4.7.2): some profile layers (TLS handshaken in the
//! parent, a WebSocket upgrade done in the parent) can't have their
//! transport state reproduced in the child, so the parent keeps the
//! real socket and pumps bytes to/from a descriptor the child sees as
//! a plain, already-connected peer.

use std::fs::File;
use std::io;
use std::os::unix::io::{FromRawFd, RawFd};
use std::thread::JoinHandle;

/// Owns both ends of the pump. Each direction runs on its own thread
/// doing a blocking `io::copy`; the pump ends when either side hits
/// EOF or an error, at which point both `File`s are dropped (closing
/// the descriptors).
pub struct FdProxy {
    handles: Vec<JoinHandle<io::Result<u64>>>,
}

impl FdProxy {
    /// Takes ownership of both descriptors. Callers must not close
    /// `left` or `right` themselves afterwards.
    pub fn spawn(left: RawFd, right: RawFd) -> Self {
        // SAFETY: both descriptors are handed to us by the caller for
        // the exclusive purpose of this pump; wrapping in `File` makes
        // closing them on drop automatic instead of leaking.
        let left_file = unsafe { File::from_raw_fd(left) };
        let right_file = unsafe { File::from_raw_fd(right) };

        let left_for_write = left_file.try_clone().ok();
        let right_for_write = right_file.try_clone().ok();

        let mut handles = Vec::with_capacity(2);
        if let Some(mut dst) = right_for_write {
            let mut src = left_file;
            handles.push(std::thread::spawn(move || io::copy(&mut src, &mut dst)));
        }
        if let Some(mut dst) = left_for_write {
            let mut src = right_file;
            handles.push(std::thread::spawn(move || io::copy(&mut src, &mut dst)));
        }
        Self { handles }
    }

    /// Block until both pump directions have finished (peer EOF or
    /// error on either side).
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::io::AsRawFd;
    use std::os::unix::io::IntoRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn bytes_written_to_one_side_arrive_on_the_other_end_of_the_pair() {
        let (a, peer_of_a) = UnixStream::pair().expect("pair");
        let (b, peer_of_b) = UnixStream::pair().expect("pair");

        let proxy = FdProxy::spawn(peer_of_a.into_raw_fd(), peer_of_b.into_raw_fd());

        let mut a = a;
        let mut b = b;
        a.write_all(b"ping").expect("write");
        a.shutdown(std::net::Shutdown::Write).ok();

        let mut got = Vec::new();
        b.read_to_end(&mut got).expect("read");
        assert_eq!(got, b"ping");

        b.shutdown(std::net::Shutdown::Write).ok();
        drop(a);
        drop(b);
        proxy.join();
    }

    #[test]
    fn spawn_accepts_any_pair_of_raw_descriptors() {
        let (a, b) = UnixStream::pair().expect("pair");
        let fd_a = a.as_raw_fd();
        assert!(fd_a >= 0);
        drop(a);
        drop(b);
    }
}
