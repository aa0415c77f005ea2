// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The orchestrator's `Context` (C8, spec.md §4.8): the one struct
//! every subsystem hangs off of, and the owner of the shared mutable
//! resources spec.md §5 names (`modules_mutex`, `child_process_mutex`,
//! `exit_mutex`, `data_mutex`, `db_list_mutex`) plus the process-wide
//! state (signal handler selection, wait queue, started flag, global
//! child limit, registered-modules list).

use std::collections::HashMap;
use std::os::raw::c_void;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::{debug, info, warn};

use tbc_conn::{ConnManager, RoleFilter};
use tbc_core::error::TurbulenceError;
use tbc_core::lockorder::{LockOrderGuard, LockRank};
use tbc_driver::BeepDriver;
use tbc_evloop::DescriptorLoop;
use tbc_module::ModuleHost;
use tbc_ppath::PPathEngine;
use tbc_storage::ListStore;
use tbc_supervisor::ChildRegistry;

use crate::pidfile::PidFile;
use tbc_config::ConfigStore;

/// The default global child limit when `<global-settings>` doesn't
/// name one; the original treats this as "effectively unbounded per
/// path, bounded by OS resources", but a finite default keeps a
/// misconfigured server from forking itself to death.
const DEFAULT_GLOBAL_CHILD_LIMIT: u32 = 256;

pub struct Context {
    config: ConfigStore,
    engine: ArcSwap<PPathEngine>,
    conns: ConnManager,
    children: ChildRegistry,
    modules: Mutex<Option<ModuleHost>>,
    descriptor_loop: DescriptorLoop,
    driver: Arc<dyn BeepDriver>,
    runtime_dir: PathBuf,

    /// `data_mutex`: the generic key/value bag (spec.md §5).
    data: Mutex<HashMap<String, String>>,
    /// `db_list_mutex`: named small-list stores (spec.md §5 /
    /// `ListStore`), keyed by whatever name the module that opened
    /// them chose.
    lists: Mutex<HashMap<String, ListStore>>,

    /// `exit_mutex`: serializes reload against shutdown (spec.md §5).
    exit_mutex: AsyncMutex<()>,
    started: AtomicBool,
    global_child_limit: AtomicU32,
    pid_file: Mutex<Option<PidFile>>,
    wait_queue: Notify,
    kill_childs_on_exit: bool,
}

impl Context {
    /// Load configuration, build the policy engine, spawn the
    /// descriptor loop, and take the PID file lock, returning a
    /// fully-wired `Context`. The module host's opaque `ctx` token is
    /// this `Context`'s own address, obtained via `Arc::new_cyclic`
    /// before construction completes.
    pub fn new(
        config_path: impl Into<PathBuf>,
        runtime_dir: impl Into<PathBuf>,
        driver: Arc<dyn BeepDriver>,
    ) -> Result<Arc<Self>, TurbulenceError> {
        let config = ConfigStore::load(config_path)?;
        let snapshot = config.snapshot();
        let engine = PPathEngine::new(snapshot.ppath.clone(), snapshot.attr_alias.clone(), driver.clone());
        let kill_childs_on_exit = snapshot.global.kill_childs_on_exit;
        let pid_file = match &snapshot.global.pid_file {
            Some(p) => Some(PidFile::acquire(p)?),
            None => None,
        };
        let descriptor_loop = DescriptorLoop::spawn().map_err(TurbulenceError::Io)?;
        let runtime_dir = runtime_dir.into();

        let ctx = Arc::new_cyclic(|weak: &Weak<Context>| {
            let ctx_ptr = weak.as_ptr() as *const c_void as *mut c_void;
            Context {
                config,
                engine: ArcSwap::from_pointee(engine),
                conns: ConnManager::new(),
                children: ChildRegistry::new(),
                modules: Mutex::new(Some(ModuleHost::new(ctx_ptr))),
                descriptor_loop,
                driver,
                runtime_dir,
                data: Mutex::new(HashMap::new()),
                lists: Mutex::new(HashMap::new()),
                exit_mutex: AsyncMutex::new(()),
                started: AtomicBool::new(false),
                global_child_limit: AtomicU32::new(DEFAULT_GLOBAL_CHILD_LIMIT),
                pid_file: Mutex::new(pid_file),
                wait_queue: Notify::new(),
                kill_childs_on_exit,
            }
        });
        Ok(ctx)
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn engine(&self) -> Arc<PPathEngine> {
        self.engine.load_full()
    }

    pub fn conns(&self) -> &ConnManager {
        &self.conns
    }

    pub fn children(&self) -> &ChildRegistry {
        &self.children
    }

    pub fn descriptor_loop(&self) -> &DescriptorLoop {
        &self.descriptor_loop
    }

    pub fn driver(&self) -> &Arc<dyn BeepDriver> {
        &self.driver
    }

    pub fn runtime_dir(&self) -> &PathBuf {
        &self.runtime_dir
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    pub fn global_child_limit(&self) -> u32 {
        self.global_child_limit.load(Ordering::SeqCst)
    }

    pub fn set_global_child_limit(&self, limit: u32) {
        self.global_child_limit.store(limit, Ordering::SeqCst);
    }

    /// Non-blocking reap of any supervised children that have exited,
    /// called from the parent's `SIGCHLD` handler (spec.md §4.7.3,
    /// §6.5 scenario 6). Decrements the reaped child's `children_running`
    /// counter so a later spawn against the same path-def can reuse the
    /// freed slot.
    pub fn reap_children(&self) {
        use nix::sys::wait::{WaitPidFlag, WaitStatus};
        use nix::unistd::Pid;

        let _corder = LockOrderGuard::new(LockRank::ChildProcess);
        loop {
            let status = match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(status) => status,
                Err(nix::errno::Errno::ECHILD) => break,
                Err(e) => {
                    warn!(error = %e, "waitpid failed while reaping children");
                    break;
                }
            };

            let pid = match status {
                WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _) => pid,
                _ => break,
            };

            if let Some(child) = self.children.remove(pid) {
                self.engine().release_child_slot(child.def_id);
                info!(pid = pid.as_raw(), def_id = child.def_id, "reaped supervised child");
            }
        }
    }

    /// Register a freshly-loaded module with the host, under
    /// `modules_mutex`.
    pub fn register_module(&self, module: tbc_module::LoadedModule) {
        let _order = LockOrderGuard::new(LockRank::Modules);
        if let Some(host) = self.modules.lock().as_mut() {
            host.adopt(module);
        }
    }

    /// Read a value from the generic data bag, under `data_mutex`.
    pub fn data_get(&self, key: &str) -> Option<String> {
        let _order = LockOrderGuard::new(LockRank::Data);
        self.data.lock().get(key).cloned()
    }

    pub fn data_set(&self, key: impl Into<String>, value: impl Into<String>) {
        let _order = LockOrderGuard::new(LockRank::Data);
        self.data.lock().insert(key.into(), value.into());
    }

    /// Open (or reuse) a named list store, under `db_list_mutex`. The
    /// store is cached in-process; repeated calls with the same name
    /// share one `ListStore` rather than racing on the same file from
    /// two independent handles.
    pub fn list_store(&self, name: &str, path: impl Into<PathBuf>) -> Result<(), TurbulenceError> {
        let _order = LockOrderGuard::new(LockRank::DbList);
        let mut lists = self.lists.lock();
        if !lists.contains_key(name) {
            lists.insert(name.to_string(), ListStore::open(path)?);
        }
        Ok(())
    }

    pub fn with_list_store<R>(&self, name: &str, f: impl FnOnce(&ListStore) -> R) -> Option<R> {
        let _order = LockOrderGuard::new(LockRank::DbList);
        self.lists.lock().get(name).map(f)
    }

    /// Re-read configuration and re-wire the policy engine and module
    /// set from it (spec.md §4.5 phase 3, §8 scenario 5). Serialized
    /// against [`Context::shutdown`] by `exit_mutex`.
    pub async fn reload(&self) -> Result<(), TurbulenceError> {
        let _order = LockOrderGuard::new(LockRank::Exit);
        let _exit = self.exit_mutex.lock().await;

        self.config.reload()?;
        let snapshot = self.config.snapshot();
        let new_engine = PPathEngine::new(snapshot.ppath.clone(), snapshot.attr_alias.clone(), self.driver.clone());
        self.engine.store(Arc::new(new_engine));

        {
            let _morder = LockOrderGuard::new(LockRank::Modules);
            if let Some(host) = self.modules.lock().as_ref() {
                host.reload_all()?;
            }
        }

        info!("configuration reloaded");
        Ok(())
    }

    /// The orchestrated exit order (spec.md §4.8): cancel accept →
    /// cleanup config → cleanup connection manager → notify modules
    /// `close` → stop BEEP engine → `unload` modules → release
    /// context. Idempotent: a second call after the first completed
    /// observes an empty module host and connection table and simply
    /// re-notifies waiters.
    pub async fn shutdown(&self) {
        let _order = LockOrderGuard::new(LockRank::Exit);
        let _exit = self.exit_mutex.lock().await;

        info!("beginning orchestrated shutdown");
        self.started.store(false, Ordering::SeqCst);

        debug!("configuration released");

        for conn in self.conns.list(RoleFilter::Any) {
            self.driver.shutdown_connection(conn);
            self.conns.unregister(conn);
        }

        let host = {
            let _morder = LockOrderGuard::new(LockRank::Modules);
            self.modules.lock().take()
        };
        if let Some(host) = host {
            host.shutdown();
        }

        if self.kill_childs_on_exit {
            let _corder = LockOrderGuard::new(LockRank::ChildProcess);
            for pid in self.children.all_pids() {
                if let Err(e) = kill(pid, Signal::SIGTERM) {
                    warn!(pid = pid.as_raw(), error = %e, "failed to signal child during shutdown");
                }
                // spec.md §5 suspension point (4): wait for each supervised
                // pid so none remain after kill_childs (property P8).
                if let Err(e) = waitpid(pid, None) {
                    warn!(pid = pid.as_raw(), error = %e, "failed to reap child during shutdown");
                }
                self.children.remove(pid);
            }
        }

        self.pid_file.lock().take();
        self.wait_queue.notify_waiters();
        info!("shutdown complete");
    }

    /// Block until [`Context::shutdown`] has run to completion.
    pub async fn wait_for_shutdown(&self) {
        self.wait_queue.notified().await;
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
