// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Spawning a child (spec.md §4.7.1).
//!
//! The control socket handshake is two sequential writes on the same
//! stream: the framed `InitString` via [`tbc_wire::write_framed_sync`]
//! (no tokio runtime exists yet on either side of a fresh `fork()`),
//! then a one-byte marker payload carrying the connection descriptor
//! as `SCM_RIGHTS` ancillary data. The child reads them in the same
//! order.

use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::unistd::{fork, ForkResult, Pid};
use rand::Rng;
use tbc_core::error::TurbulenceError;
use tbc_core::ppath::{PPathDef, PathId};
use tbc_wire::{read_framed_sync, write_framed_sync, ConnStatus, InitString};

use crate::child::Child;
use crate::control_socket::{recv_with_fd, send_with_fd};

/// A marker payload accompanying the `SCM_RIGHTS` message; its content
/// carries no meaning beyond "a descriptor follows".
const FD_MARKER: &[u8] = b"F";

/// Everything the orchestrator has already decided before asking this
/// crate to fork: which path the connection matched, the reduced
/// engine's management-plane address, and the descriptors to hand
/// over. Privilege transitions and BEEP re-initialization happen on
/// the child side of the call, driven by these fields.
pub struct SpawnRequest {
    pub def_id: PathId,
    pub server_name: Option<String>,
    pub conn_fd: RawFd,
    pub log_fds: [(i32, i32); 4],
    pub console_flags: u32,
    pub parent_host: String,
    pub parent_port: String,
    pub runtime_dir: PathBuf,
    pub user_id: Option<u32>,
    pub group_id: Option<u32>,
    pub chroot: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub reuse: bool,
    /// When true, the child skips restoring the transferred connection
    /// and instead dispatches its first channel-start fresh (spec.md
    /// §4.7.1 step 6, the `conn_status` trailing flag).
    pub skip_restore: bool,
}

/// What the child received after a successful fork and handoff. The
/// caller (`tbc-daemon`) is responsible for re-initializing its BEEP
/// engine, applying privilege transitions
/// ([`crate::privilege::change_root`]/[`crate::privilege::change_user_id`]),
/// and restoring or freshly dispatching the connection per
/// `init_string.conn_status`.
pub struct ChildHandoff {
    pub init_string: InitString,
    pub conn_fd: RawFd,
}

/// The two branches after [`spawn_child`] returns in each process.
pub enum ForkOutcome {
    Parent(Arc<Child>),
    Child(ChildHandoff),
}

/// Pick `runtime/turbulence/<rand>.tbc` under `runtime_dir`, creating
/// the `turbulence` directory if missing.
fn control_socket_path(runtime_dir: &Path) -> Result<PathBuf, TurbulenceError> {
    let dir = runtime_dir.join("turbulence");
    std::fs::create_dir_all(&dir).map_err(TurbulenceError::Io)?;
    let suffix: u64 = rand::thread_rng().gen();
    Ok(dir.join(format!("{suffix:x}.tbc")))
}

/// Fork a child to own `req.conn_fd`'s connection under a
/// `separate`-mode path. See spec.md §4.7.1 for the full procedure;
/// steps handled by the caller (management-plane listener, pipes) are
/// passed in already built.
///
/// Preconditions (spec.md §4.7.1): `def.separate`, the caller is the
/// parent, and `def.children_running < def.effective_limit(global_limit)`.
/// This function enforces the last one itself, atomically reserving a
/// slot before forking and releasing it again if anything below fails;
/// the slot otherwise stays reserved until the parent reaps this child
/// on `SIGCHLD` and calls [`PPathDef::release_child_slot`].
///
/// # Safety / threading
///
/// Must only be called while no other thread holds a lock that the
/// child would need to make progress (classic `fork()` hazard): in
/// practice this means calling it before the tokio runtime's worker
/// threads exist, or from a context where only this thread is active.
pub fn spawn_child(req: SpawnRequest, def: &PPathDef, global_limit: u32) -> Result<ForkOutcome, TurbulenceError> {
    def.try_reserve_child_slot(global_limit)?;
    match spawn_child_inner(req) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            def.release_child_slot();
            Err(e)
        }
    }
}

fn spawn_child_inner(req: SpawnRequest) -> Result<ForkOutcome, TurbulenceError> {
    let socket_path = control_socket_path(&req.runtime_dir)?;
    let listener = UnixListener::bind(&socket_path).map_err(|e| TurbulenceError::ChildSpawnFailed {
        path_name: socket_path.display().to_string(),
        reason: format!("failed to bind control socket: {e}"),
    })?;

    // SAFETY: called before any additional worker threads exist in
    // the caller's runtime, per this function's documented contract.
    let fork_result = unsafe { fork() }.map_err(|e| TurbulenceError::ChildSpawnFailed {
        path_name: socket_path.display().to_string(),
        reason: format!("fork() failed: {e}"),
    })?;

    match fork_result {
        ForkResult::Parent { child } => {
            let (stream, _addr) = listener.accept().map_err(|e| TurbulenceError::ChildSpawnFailed {
                path_name: socket_path.display().to_string(),
                reason: format!("failed to accept child's control connection: {e}"),
            })?;
            send_handoff(&stream, &req)?;
            // The fd now lives in the child; drop our copy.
            let _ = nix::unistd::close(req.conn_fd);

            let handle = Child::new(
                child,
                req.def_id,
                req.server_name,
                socket_path,
                stream,
                req.reuse,
            );
            Ok(ForkOutcome::Parent(Arc::new(handle)))
        }
        ForkResult::Child => {
            drop(listener);
            let stream = connect_with_retry(&socket_path)?;
            let handoff = recv_handoff(&stream)?;
            let _ = std::fs::remove_file(&socket_path);
            Ok(ForkOutcome::Child(handoff))
        }
    }
}

/// Route an already-live connection to an existing reusable child
/// instead of forking again (spec.md §4.7.4): the same
/// init-string-then-`SCM_RIGHTS` handshake, replayed on the existing
/// child's control socket.
///
/// No new process is created, so no slot is reserved here; this only
/// guards against `children_running` having somehow drifted past the
/// effective limit (e.g. a lowered `child-limit` after reload), which
/// would indicate a bookkeeping bug elsewhere rather than a normal
/// over-capacity condition.
pub fn hand_off_to_existing_child(
    child: &Child,
    req: SpawnRequest,
    def: &PPathDef,
    global_limit: u32,
) -> Result<(), TurbulenceError> {
    if def.children_running() > def.effective_limit(global_limit) {
        return Err(TurbulenceError::ChildSpawnFailed {
            path_name: def.name.clone().unwrap_or_else(|| "(unnamed)".to_string()),
            reason: "child limit exceeded, refusing to hand off to existing child".to_string(),
        });
    }
    child.with_control_stream(|stream| send_handoff(stream, &req))?;
    let _ = nix::unistd::close(req.conn_fd);
    Ok(())
}

fn send_handoff(mut stream: &UnixStream, req: &SpawnRequest) -> Result<(), TurbulenceError> {
    let init = InitString {
        conn_fd: req.conn_fd,
        log_fds: req.log_fds,
        console_flags: req.console_flags,
        path_id: req.def_id,
        conn_status: ConnStatus {
            subfields: vec![
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                req.server_name.clone().unwrap_or_default(),
            ],
            skip_first_reply: req.skip_restore,
        },
        parent_host: req.parent_host.clone(),
        parent_port: req.parent_port.clone(),
    };
    write_framed_sync(&mut stream, &init.encode())?;
    send_with_fd(stream.as_raw_fd(), FD_MARKER, req.conn_fd)
}

fn recv_handoff(stream: &UnixStream) -> Result<ChildHandoff, TurbulenceError> {
    let mut reader = stream;
    let raw = read_framed_sync(&mut reader)?;
    let init_string = InitString::decode(&raw)?;
    let mut marker = [0u8; FD_MARKER.len()];
    let (_, conn_fd) = recv_with_fd(stream.as_raw_fd(), &mut marker)?;
    Ok(ChildHandoff { init_string, conn_fd })
}

/// The child's `connect()` can race the parent's `accept()`; retry a
/// handful of times with a short backoff rather than failing the
/// whole handover on a transient `ENOENT`/`ECONNREFUSED`.
fn connect_with_retry(path: &Path) -> Result<UnixStream, TurbulenceError> {
    const ATTEMPTS: u32 = 20;
    let mut last_err = None;
    for attempt in 0..ATTEMPTS {
        match UnixStream::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_err = Some(e);
                std::thread::sleep(std::time::Duration::from_millis(5 * u64::from(attempt + 1)));
            }
        }
    }
    Err(TurbulenceError::ChildSpawnFailed {
        path_name: path.display().to_string(),
        reason: format!(
            "failed to connect to control socket after {ATTEMPTS} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::IntoRawFd;

    fn sample_request(conn_fd: RawFd, runtime_dir: PathBuf) -> SpawnRequest {
        SpawnRequest {
            def_id: 3,
            server_name: Some("core-admin".to_string()),
            conn_fd,
            log_fds: [(1, 2), (3, 4), (5, 6), (7, 8)],
            console_flags: 0,
            parent_host: "127.0.0.1".to_string(),
            parent_port: "9000".to_string(),
            runtime_dir,
            user_id: None,
            group_id: None,
            chroot: None,
            work_dir: None,
            reuse: true,
            skip_restore: false,
        }
    }

    #[test]
    fn control_socket_path_lands_under_a_turbulence_subdirectory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = control_socket_path(dir.path()).expect("path");
        assert_eq!(path.parent().unwrap().file_name().unwrap(), "turbulence");
        assert_eq!(path.extension().unwrap(), "tbc");
    }

    #[test]
    fn send_then_recv_handoff_round_trips_the_init_string_and_fd() {
        let (parent_side, child_side) = UnixStream::pair().expect("pair");
        let (passed, _keep_alive) = UnixStream::pair().expect("pair");
        let passed_fd = passed.into_raw_fd();

        let dir = tempfile::tempdir().expect("tempdir");
        let req = sample_request(passed_fd, dir.path().to_path_buf());

        send_handoff(&parent_side, &req).expect("send handoff");
        let handoff = recv_handoff(&child_side).expect("recv handoff");

        assert_eq!(handoff.init_string.path_id, 3);
        assert_eq!(handoff.init_string.conn_status.server_name(), Some("core-admin"));
        assert!(handoff.conn_fd >= 0);

        // SAFETY: the descriptor arrived via `recvmsg`'s `SCM_RIGHTS`
        // and is owned solely by this test from here on.
        unsafe {
            nix::unistd::close(handoff.conn_fd).ok();
        }
    }
}
