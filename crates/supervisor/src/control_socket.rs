// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! `SCM_RIGHTS` fd passing over the Unix-domain control socket (spec.md
//! §4.7.1 step 2 / §4.7.2): a descriptor accompanies the framed
//! `InitString` payload on the child's first write.

use std::io::IoSlice;
use std::os::unix::io::RawFd;

use nix::cmsg_space;
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use tbc_core::error::TurbulenceError;

/// Send `payload` plus a single passed descriptor in one `sendmsg(2)`.
pub fn send_with_fd(socket_fd: RawFd, payload: &[u8], passed_fd: RawFd) -> Result<(), TurbulenceError> {
    let iov = [IoSlice::new(payload)];
    let fds = [passed_fd];
    let cmsg = [ControlMessage::ScmRights(&fds)];
    sendmsg::<()>(socket_fd, &iov, &cmsg, MsgFlags::empty(), None).map_err(|e| {
        TurbulenceError::TransportFault {
            fd: socket_fd,
            reason: format!("sendmsg with SCM_RIGHTS failed: {e}"),
        }
    })?;
    Ok(())
}

/// Receive up to `buf.len()` bytes plus exactly one passed descriptor.
///
/// Returns the number of payload bytes read and the received
/// descriptor. A message carrying zero or more than one descriptor is
/// a protocol violation on this socket and is reported as
/// [`TurbulenceError::TransportFault`].
pub fn recv_with_fd(socket_fd: RawFd, buf: &mut [u8]) -> Result<(usize, RawFd), TurbulenceError> {
    let mut iov = [std::io::IoSliceMut::new(buf)];
    let mut cmsg_buffer = cmsg_space!([RawFd; 1]);
    let msg = recvmsg::<()>(socket_fd, &mut iov, Some(&mut cmsg_buffer), MsgFlags::empty()).map_err(|e| {
        TurbulenceError::TransportFault {
            fd: socket_fd,
            reason: format!("recvmsg failed: {e}"),
        }
    })?;

    let mut received: Option<RawFd> = None;
    for cmsg in msg.cmsgs().map_err(|e| TurbulenceError::TransportFault {
        fd: socket_fd,
        reason: format!("malformed control message: {e}"),
    })? {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            match fds.as_slice() {
                [fd] => received = Some(*fd),
                _ => {
                    return Err(TurbulenceError::TransportFault {
                        fd: socket_fd,
                        reason: format!("expected exactly one passed descriptor, got {}", fds.len()),
                    })
                }
            }
        }
    }

    let passed_fd = received.ok_or_else(|| TurbulenceError::TransportFault {
        fd: socket_fd,
        reason: "control message carried no SCM_RIGHTS descriptor".to_string(),
    })?;

    Ok((msg.bytes, passed_fd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn round_trips_a_passed_descriptor_alongside_a_payload() {
        let (a, b) = UnixStream::pair().expect("pair");
        // Any open fd works as the thing being passed; reuse one end
        // of a second pair as the "payload" descriptor.
        let (passed, _keep_alive) = UnixStream::pair().expect("pair");

        send_with_fd(a.as_raw_fd(), b"hello", passed.as_raw_fd()).expect("send");

        let mut buf = [0u8; 64];
        let (n, fd) = recv_with_fd(b.as_raw_fd(), &mut buf).expect("recv");
        assert_eq!(&buf[..n], b"hello");
        assert!(fd >= 0);

        // SAFETY: `fd` was just handed to us by the kernel via
        // `recvmsg` and is not otherwise owned; closing it here avoids
        // leaking it for the duration of the test process.
        unsafe {
            nix::unistd::close(fd).ok();
        }
    }

    #[test]
    fn rejects_a_message_with_no_passed_descriptor() {
        let (a, b) = UnixStream::pair().expect("pair");
        use std::io::Write;
        let mut a = a;
        a.write_all(b"no-fd-here").expect("write");

        let mut buf = [0u8; 64];
        let result = recv_with_fd(b.as_raw_fd(), &mut buf);
        assert!(result.is_err());
    }
}
