// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The loop itself: inbox drain, `mio::Poll` wait, dispatch, and the
//! broken-fd discard pass (spec.md §4.3).

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use nix::sys::socket::{recv, MsgFlags};
use tracing::{debug, error, warn};

use crate::msg::{LoopMsg, OnRead};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

struct Entry {
    fd: RawFd,
    on_read: OnRead,
    ctx1: u64,
    ctx2: u64,
}

/// Handle to a running descriptor loop. Dropping it does not stop the
/// loop; call [`stop`](Self::stop) for an orderly shutdown.
pub struct DescriptorLoop {
    inbox: Sender<LoopMsg>,
    handle: Option<JoinHandle<()>>,
}

impl DescriptorLoop {
    /// Spawn the loop on its own OS thread, named `"tbc-evloop"`
    /// (spec.md §4.3 / §5 scheduling model: its suspension point is an
    /// OS-level readiness wait, not an `.await` point).
    pub fn spawn() -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let handle = std::thread::Builder::new()
            .name("tbc-evloop".to_string())
            .spawn(move || run(rx))?;
        Ok(Self {
            inbox: tx,
            handle: Some(handle),
        })
    }

    /// Register a descriptor. FIFO with respect to every other inbox
    /// message (spec.md §4.3 "guarantees FIFO inbox processing").
    pub fn register(&self, fd: RawFd, on_read: OnRead, ctx1: u64, ctx2: u64) {
        let _ = self.inbox.send(LoopMsg::Add { fd, on_read, ctx1, ctx2 });
    }

    /// Unregister `fd` and block until the loop has actually dropped it
    /// from the poll set.
    pub fn unregister_sync(&self, fd: RawFd) {
        let (reply_tx, reply_rx) = bounded(1);
        if self
            .inbox
            .send(LoopMsg::Remove {
                fd,
                reply: Some(reply_tx),
            })
            .is_ok()
        {
            let _ = reply_rx.recv();
        }
    }

    pub fn unregister(&self, fd: RawFd) {
        let _ = self.inbox.send(LoopMsg::Remove { fd, reply: None });
    }

    /// Ask the loop to stop and join its thread.
    pub fn stop(mut self) {
        let _ = self.inbox.send(LoopMsg::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(rx: Receiver<LoopMsg>) {
    let mut poll = match Poll::new() {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "descriptor loop failed to create mio::Poll, exiting");
            return;
        }
    };
    let mut events = Events::with_capacity(256);
    let mut entries: HashMap<Token, Entry> = HashMap::new();
    let mut fd_to_token: HashMap<RawFd, Token> = HashMap::new();
    let mut next_token = 0usize;

    'outer: loop {
        while let Ok(msg) = rx.try_recv() {
            match msg {
                LoopMsg::Add { fd, on_read, ctx1, ctx2 } => {
                    let token = Token(next_token);
                    next_token += 1;
                    if let Err(e) = poll
                        .registry()
                        .register(&mut SourceFd(&fd), token, Interest::READABLE)
                    {
                        warn!(fd, error = %e, "failed to register descriptor, dropping it");
                        continue;
                    }
                    fd_to_token.insert(fd, token);
                    entries.insert(token, Entry { fd, on_read, ctx1, ctx2 });
                }
                LoopMsg::Remove { fd, reply } => {
                    remove_fd(&mut poll, &mut entries, &mut fd_to_token, fd);
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                }
                LoopMsg::Stop => break 'outer,
            }
        }

        // A bad registered fd doesn't make `epoll_wait` itself fail
        // (the kernel just drops it silently), but mio's other
        // backends (e.g. `poll(2)` on some platforms) can surface it
        // as `EBADF` from the call as a whole. That's the only case
        // spec.md §4.3 / SPEC_FULL §9.4 name for the broken-fd probe;
        // run it then instead of every cycle.
        let had_ebadf = match poll.poll(&mut events, Some(POLL_TIMEOUT)) {
            Ok(()) => false,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if e.raw_os_error() == Some(nix::errno::Errno::EBADF as i32) => {
                warn!(error = %e, "mio poll() reported EBADF, probing registered descriptors");
                true
            }
            Err(e) => {
                error!(error = %e, "mio poll() failed");
                continue;
            }
        };

        let mut to_remove = Vec::new();
        if had_ebadf {
            discard_broken(&entries, &mut to_remove);
        } else {
            for event in events.iter() {
                let token = event.token();
                let keep = if let Some(entry) = entries.get_mut(&token) {
                    (entry.on_read)(entry.fd, entry.ctx1, entry.ctx2)
                } else {
                    true
                };
                if !keep {
                    to_remove.push(token);
                }
            }
        }

        for token in to_remove {
            if let Some(entry) = entries.get(&token) {
                let fd = entry.fd;
                remove_fd(&mut poll, &mut entries, &mut fd_to_token, fd);
            }
        }
    }

    for (_, entry) in entries.drain() {
        let _ = poll.registry().deregister(&mut SourceFd(&entry.fd));
    }
}

fn remove_fd(
    poll: &mut Poll,
    entries: &mut HashMap<Token, Entry>,
    fd_to_token: &mut HashMap<RawFd, Token>,
    fd: RawFd,
) {
    if let Some(token) = fd_to_token.remove(&fd) {
        if let Some(entry) = entries.remove(&token) {
            let _ = poll.registry().deregister(&mut SourceFd(&entry.fd));
        }
    }
}

/// Probe every registered descriptor not already slated for removal
/// with a zero-byte `MSG_PEEK` and drop the ones reporting `EBADF`.
/// Called only after `poll()` itself reported `EBADF` (spec.md §4.3,
/// mirroring `original_source/src/turbulence-loop.c`'s
/// `__turbulence_loop_discard_broken`, which runs from the equivalent
/// error path rather than every iteration).
fn discard_broken(entries: &HashMap<Token, Entry>, to_remove: &mut Vec<Token>) {
    for (token, entry) in entries {
        if to_remove.contains(token) {
            continue;
        }
        match recv(entry.fd, &mut [], MsgFlags::MSG_PEEK) {
            Ok(_) => {}
            Err(nix::errno::Errno::EBADF) => {
                debug!(fd = entry.fd, "descriptor reports EBADF, dropping");
                to_remove.push(*token);
            }
            Err(_) => {}
        }
    }
}

#[cfg(test)]
#[path = "descloop_tests.rs"]
mod tests;
